//! Aurora Request Gateway
//!
//! This crate provides the client-side access layer for the Aurora
//! monitoring backend with:
//! - ApiGateway: Constructible gateway owning cache, queue, and session state
//! - Transport: Pluggable delivery strategy (direct, relay, or hybrid fallback)
//! - ResponseCache: Read-through cache with tiered freshness windows
//! - RequestQueue: Concurrency cap with coalescing of identical in-flight GETs
//! - Response classification: Typed outcomes driving retry, degradation, and
//!   error propagation
//! - SessionStore: Credential storage gating and auth-failure invalidation

pub mod auth;
pub mod cache;
pub mod classify;
pub mod fallback;
pub mod gateway;
pub mod queue;
pub mod session;
pub mod transport;

pub use aurora_common::{
    CacheTier, CallOptions, FreshnessConfig, GatewayConfig, GatewayError, GatewayStats, Method,
    RequestDescriptor, Result, Session,
};
pub use cache::ResponseCache;
pub use classify::{classify, Outcome, RawResponse};
pub use fallback::empty_value_for;
pub use gateway::ApiGateway;
pub use queue::RequestQueue;
pub use session::{MemorySessionStore, SessionStore};
pub use transport::{
    FallbackTransport, HttpTransport, RelayTransport, Transport, TransportRequest,
};
