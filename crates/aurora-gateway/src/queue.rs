//! Bounded request execution with in-flight coalescing
//!
//! A system-wide semaphore caps concurrently executing requests. Identical
//! GETs already in flight are coalesced: the first caller leads the
//! execution and broadcasts its outcome; concurrent duplicates subscribe
//! instead of dispatching again. The ticket is removed before the
//! broadcast, so a caller arriving after completion re-dispatches rather
//! than joining a finished flight.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use aurora_common::{GatewayError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore, SemaphorePermit};
use tracing::debug;

type SharedOutcome = Result<Value>;

/// Removes the in-flight ticket when the leading execution completes or is
/// cancelled. A cancelled leader drops the only senders, closing the
/// channel and waking followers to dispatch for themselves.
struct FlightTicket<'a> {
    map: &'a DashMap<String, broadcast::Sender<SharedOutcome>>,
    key: &'a str,
    armed: bool,
}

impl<'a> FlightTicket<'a> {
    fn remove(&mut self) {
        if self.armed {
            self.map.remove(self.key);
            self.armed = false;
        }
    }
}

impl<'a> Drop for FlightTicket<'a> {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Concurrency limiter and GET coalescer shared by one gateway instance
pub struct RequestQueue {
    semaphore: Semaphore,
    in_flight: DashMap<String, broadcast::Sender<SharedOutcome>>,
    coalesced: AtomicU64,
}

impl RequestQueue {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrency),
            in_flight: DashMap::new(),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Run `exec` under the concurrency cap.
    ///
    /// With a coalescing key (GETs only), a duplicate of an in-flight
    /// request shares the leader's outcome instead of executing.
    pub async fn run<F, Fut>(&self, key: Option<&str>, exec: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let Some(key) = key else {
            let _permit = self.acquire().await?;
            return exec().await;
        };

        loop {
            let role = match self.in_flight.entry(key.to_string()) {
                Entry::Occupied(entry) => Role::Follower(entry.get().subscribe()),
                Entry::Vacant(entry) => {
                    let (tx, _) = broadcast::channel(1);
                    entry.insert(tx.clone());
                    Role::Leader(tx)
                }
            };

            match role {
                Role::Leader(tx) => {
                    let mut ticket = FlightTicket {
                        map: &self.in_flight,
                        key,
                        armed: true,
                    };
                    let outcome = match self.acquire().await {
                        Ok(_permit) => exec().await,
                        Err(e) => Err(e),
                    };
                    ticket.remove();
                    let _ = tx.send(outcome.clone());
                    return outcome;
                }
                Role::Follower(mut rx) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Joining in-flight request");
                    match rx.recv().await {
                        Ok(outcome) => return outcome,
                        // Leader cancelled before broadcasting; dispatch ourselves
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| GatewayError::transport("request queue is closed"))
    }

    /// Number of requests currently holding an in-flight ticket
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Total duplicate requests served from a shared in-flight execution
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

enum Role {
    Leader(broadcast::Sender<SharedOutcome>),
    Follower(broadcast::Receiver<SharedOutcome>),
}
