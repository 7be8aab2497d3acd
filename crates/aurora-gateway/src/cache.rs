//! Read-through response cache for GET requests
//!
//! Entries older than the caller's freshness window are treated as absent
//! and evicted on read. Only successful GET responses are inserted;
//! mutations invalidate by path substring to force the next read upstream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

struct CacheEntry {
    payload: Value,
    inserted_at: Instant,
}

/// Cache keyed by request descriptor (`"METHOD path"`)
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached payload no older than `window`.
    ///
    /// Stale entries are evicted rather than returned.
    pub fn get(&self, key: &str, window: Duration) -> Option<Value> {
        let fresh = match self.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= window => Some(entry.payload.clone()),
            Some(_) => None,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match fresh {
            Some(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(payload)
            }
            None => {
                self.entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: &str, payload: Value) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove entries whose key contains `pattern`, or all entries when
    /// no pattern is given. Returns the number of entries removed.
    pub fn invalidate(&self, pattern: Option<&str>) -> usize {
        match pattern {
            Some(pattern) => {
                let before = self.entries.len();
                self.entries.retain(|key, _| !key.contains(pattern));
                before - self.entries.len()
            }
            None => {
                let removed = self.entries.len();
                self.entries.clear();
                removed
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
