//! ApiGateway - request orchestration
//!
//! One constructible object owning the cache, the request queue, and the
//! session store. Control flow per call: session warn-gate, cache read
//! (GETs), coalescing join, then a dispatch loop of transport + classify
//! with exponential backoff on transient failures. Recoverable
//! degradation resolves to a shape-appropriate empty value; classified
//! failures propagate to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aurora_common::{
    CallOptions, GatewayConfig, GatewayError, GatewayStats, RequestDescriptor, Result,
};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::classify::{classify, Outcome};
use crate::fallback::empty_value_for;
use crate::queue::RequestQueue;
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::{HttpTransport, Transport, TransportRequest};

/// Client-side gateway to the Aurora backend
pub struct ApiGateway {
    config: GatewayConfig,
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    queue: RequestQueue,
    sessions: Arc<dyn SessionStore>,
    dispatches: AtomicU64,
    retries: AtomicU64,
    degraded: AtomicU64,
}

impl ApiGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        Self::with_session_store(config, transport, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_session_store(
        config: GatewayConfig,
        transport: Arc<dyn Transport>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            queue: RequestQueue::new(config.max_concurrency),
            cache: ResponseCache::new(),
            config,
            transport,
            sessions,
            dispatches: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
        }
    }

    /// Gateway with a direct HTTP transport against `config.base_url`
    pub fn direct(config: GatewayConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, transport))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Request entry points
    // ------------------------------------------------------------------

    pub async fn get(&self, path: impl Into<String>) -> Result<Value> {
        self.call_with(RequestDescriptor::get(path), CallOptions::default())
            .await
    }

    pub async fn get_with(&self, path: impl Into<String>, options: CallOptions) -> Result<Value> {
        self.call_with(RequestDescriptor::get(path), options).await
    }

    pub async fn post(&self, path: impl Into<String>, body: Value) -> Result<Value> {
        self.call_with(RequestDescriptor::post(path, body), CallOptions::default())
            .await
    }

    pub async fn put(&self, path: impl Into<String>, body: Value) -> Result<Value> {
        self.call_with(
            RequestDescriptor::new(path, aurora_common::Method::Put, Some(body)),
            CallOptions::default(),
        )
        .await
    }

    pub async fn patch(&self, path: impl Into<String>, body: Value) -> Result<Value> {
        self.call_with(
            RequestDescriptor::new(path, aurora_common::Method::Patch, Some(body)),
            CallOptions::default(),
        )
        .await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<Value> {
        self.call_with(
            RequestDescriptor::new(path, aurora_common::Method::Delete, None),
            CallOptions::default(),
        )
        .await
    }

    pub async fn call(&self, descriptor: RequestDescriptor) -> Result<Value> {
        self.call_with(descriptor, CallOptions::default()).await
    }

    pub async fn call_with(
        &self,
        descriptor: RequestDescriptor,
        options: CallOptions,
    ) -> Result<Value> {
        let request_id = Uuid::new_v4();
        let token = self.sessions.token();

        // The gateway never blocks on a missing credential: some endpoints
        // are publicly readable. Auth endpoints are expected to run without
        // a session.
        if token.is_none() && !self.is_auth_path(&descriptor.path) {
            warn!(
                request_id = %request_id,
                path = %descriptor.path,
                "Request issued without a session credential"
            );
        }

        let key = descriptor.method.is_get().then(|| descriptor.cache_key());

        if let Some(key) = &key {
            if !options.bypass_cache {
                let window = self.config.freshness.window(options.tier);
                if let Some(cached) = self.cache.get(key, window) {
                    debug!(
                        request_id = %request_id,
                        path = %descriptor.path,
                        "Serving cached response"
                    );
                    return Ok(cached);
                }
            }
        }

        self.queue
            .run(key.as_deref(), || {
                self.execute(&descriptor, &options, token, request_id)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Dispatch loop
    // ------------------------------------------------------------------

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        options: &CallOptions,
        token: Option<String>,
        request_id: Uuid,
    ) -> Result<Value> {
        let request = TransportRequest {
            path: descriptor.path.clone(),
            method: descriptor.method,
            body: descriptor.body.clone(),
            bearer: token,
            timeout: options.timeout,
        };

        self.dispatches.fetch_add(1, Ordering::Relaxed);
        let mut attempt: u32 = 0;

        loop {
            let raw = self.transport.send(&request).await;
            match classify(&descriptor.path, raw) {
                Outcome::Success(value) => {
                    if descriptor.method.is_get() {
                        self.cache.put(&descriptor.cache_key(), value.clone());
                    }
                    debug!(
                        request_id = %request_id,
                        path = %descriptor.path,
                        attempt = attempt,
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Outcome::Degrade(err) => {
                    self.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        request_id = %request_id,
                        path = %descriptor.path,
                        error = %err,
                        "Degrading to empty response"
                    );
                    return Ok(empty_value_for(&descriptor.path));
                }
                Outcome::Fail(err) => {
                    self.handle_failure(&err, &descriptor.path, request_id);
                    return Err(err);
                }
                Outcome::Retry(err) => {
                    if attempt + 1 >= self.config.max_attempts {
                        warn!(
                            request_id = %request_id,
                            path = %descriptor.path,
                            attempts = self.config.max_attempts,
                            error = %err,
                            "Retries exhausted"
                        );
                        return Err(err);
                    }
                    let delay = self.config.initial_backoff * 2u32.pow(attempt);
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        request_id = %request_id,
                        path = %descriptor.path,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn handle_failure(&self, error: &GatewayError, path: &str, request_id: Uuid) {
        // An auth failure from an auth endpoint means the credential is
        // dead. The same failure elsewhere may be one unhappy endpoint, so
        // the session survives it.
        if matches!(error, GatewayError::Authentication { .. }) && self.is_auth_path(path) {
            warn!(
                request_id = %request_id,
                path = %path,
                "Authentication failure on auth endpoint, clearing session"
            );
            self.sessions.clear();
        }
    }

    fn is_auth_path(&self, path: &str) -> bool {
        path.starts_with(&self.config.auth_path_prefix)
    }

    // ------------------------------------------------------------------
    // Session and cache management
    // ------------------------------------------------------------------

    pub fn has_session(&self) -> bool {
        self.sessions.has_session()
    }

    pub fn set_session(&self, token: &str) {
        self.sessions.set(token);
    }

    pub fn clear_session(&self) {
        self.sessions.clear();
    }

    /// Drop cached entries whose key contains `pattern`, or everything when
    /// no pattern is given. Called after mutations to force fresh reads.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.invalidate(pattern);
        debug!(pattern = ?pattern, removed = removed, "Cache invalidated");
        removed
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            cache_entries: self.cache.len(),
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            in_flight: self.queue.in_flight(),
            coalesced: self.queue.coalesced(),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.config.base_url)
            .field("max_attempts", &self.config.max_attempts)
            .field("max_concurrency", &self.config.max_concurrency)
            .finish()
    }
}
