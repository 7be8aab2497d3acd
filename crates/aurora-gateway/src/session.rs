//! Session credential storage
//!
//! The gateway never blocks a request for lack of a credential; it only
//! warns, since some endpoints are publicly readable. Auth failures on
//! auth-prefixed paths clear the store (see `gateway`).

use aurora_common::Session;
use parking_lot::RwLock;

/// Storage seam for the bearer credential.
///
/// Accessors are plain state operations and never fail. Embedders that need
/// the credential to survive restarts implement this over their own storage.
pub trait SessionStore: Send + Sync {
    /// Current bearer token, if a session is held
    fn token(&self) -> Option<String>;

    /// Replace the stored credential
    fn set(&self, token: &str);

    /// Remove all stored credential material
    fn clear(&self);

    fn has_session(&self) -> bool {
        self.token().map(|t| !t.is_empty()).unwrap_or(false)
    }
}

/// In-memory store, scoped to the gateway's lifetime
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|s| s.token.clone())
    }

    fn set(&self, token: &str) {
        *self.inner.write() = Some(Session::new(token));
    }

    fn clear(&self) {
        *self.inner.write() = None;
    }
}
