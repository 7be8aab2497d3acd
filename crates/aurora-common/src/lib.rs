use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Request Types
// ============================================================================

/// HTTP method of a logical request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// The tuple identifying a logical operation against the backend.
///
/// GETs carry query parameters in the path, so the cache/coalescing key is
/// method + path and the body is ignored for keying purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: Method,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>, method: Method, body: Option<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            method,
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path, Method::Get, None)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(path, Method::Post, Some(body))
    }

    /// Key used for caching and in-flight coalescing
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Bearer credential for the backend, with its issue time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Freshness tier for cached GET responses, matching the polling cadence
/// of the corresponding dashboard queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheTier {
    /// Rapidly-changing data (live readings)
    Fast,
    /// Ordinary queries
    Standard,
    /// Slow-moving data (system info, profiles)
    Slow,
}

/// Freshness window per cache tier
#[derive(Debug, Clone)]
pub struct FreshnessConfig {
    pub fast: Duration,
    pub standard: Duration,
    pub slow: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(90),
            standard: Duration::from_secs(150),
            slow: Duration::from_secs(420),
        }
    }
}

impl FreshnessConfig {
    pub fn window(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Fast => self.fast,
            CacheTier::Standard => self.standard,
            CacheTier::Slow => self.slow,
        }
    }
}

/// Per-call options
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Freshness tier used for cache reads and writes
    pub tier: CacheTier,
    /// Per-call timeout override; the transport's default applies when unset
    pub timeout: Option<Duration>,
    /// Skip the cache read (the response is still cached on success)
    pub bypass_cache: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            tier: CacheTier::Standard,
            timeout: None,
            bypass_cache: false,
        }
    }
}

impl CallOptions {
    pub fn tier(tier: CacheTier) -> Self {
        Self {
            tier,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn bypassing_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

// ============================================================================
// Gateway Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream base URL
    pub base_url: String,
    /// Maximum dispatch attempts per request (first try included)
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent retry
    pub initial_backoff: Duration,
    /// System-wide cap on concurrently executing requests
    pub max_concurrency: usize,
    /// Connect timeout for the underlying HTTP client
    pub connect_timeout: Duration,
    /// Default request timeout
    pub request_timeout: Duration,
    /// Path prefix of the authentication endpoints (login/logout/verify/me)
    pub auth_path_prefix: String,
    /// Freshness windows per cache tier
    pub freshness: FreshnessConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_concurrency: 6,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            auth_path_prefix: "/api/auth".to_string(),
            freshness: FreshnessConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let parse_ms = |name: &str, fallback: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            base_url: std::env::var("AURORA_BASE_URL").unwrap_or(defaults.base_url),
            max_attempts: std::env::var("AURORA_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_attempts),
            initial_backoff: parse_ms("AURORA_INITIAL_BACKOFF_MS", defaults.initial_backoff),
            max_concurrency: std::env::var("AURORA_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrency),
            connect_timeout: parse_ms("AURORA_CONNECT_TIMEOUT_MS", defaults.connect_timeout),
            request_timeout: parse_ms("AURORA_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            auth_path_prefix: std::env::var("AURORA_AUTH_PATH_PREFIX")
                .unwrap_or(defaults.auth_path_prefix),
            freshness: defaults.freshness,
        }
    }
}

// ============================================================================
// Gateway Statistics
// ============================================================================

/// Snapshot of gateway counters, taken via `ApiGateway::stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStats {
    pub cache_entries: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub in_flight: usize,
    pub coalesced: u64,
    pub dispatches: u64,
    pub retries: u64,
    pub degraded: u64,
}

// ============================================================================
// Error Types
// ============================================================================

/// Classified gateway error.
///
/// Variants carry owned strings so coalesced waiters can share a cloned
/// outcome. `Transient` is only surfaced once retries are exhausted;
/// degradation paths resolve to empty values instead of erroring.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication error ({status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("Not found ({status}): {message}")]
    NotFound { status: u16, message: String },

    #[error("Transient error: {message}")]
    Transient { message: String },

    #[error("Backend error: {message}")]
    Fatal {
        status: Option<u16>,
        message: String,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl GatewayError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            status: 401,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            status: 404,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn fatal(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fatal {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// HTTP status carried by the classification, where one applies
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::NotFound { status, .. } => Some(*status),
            Self::Fatal { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_body() {
        let a = RequestDescriptor::get("/api/sensors/list");
        let b = RequestDescriptor::new(
            "/api/sensors/list",
            Method::Get,
            Some(serde_json::json!({"ignored": true})),
        );
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "GET /api/sensors/list");
    }

    #[test]
    fn test_cache_key_distinguishes_methods() {
        let get = RequestDescriptor::get("/api/alerts/rules");
        let post = RequestDescriptor::post("/api/alerts/rules", serde_json::json!({}));
        assert_ne!(get.cache_key(), post.cache_key());
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_string(&Method::Get).unwrap();
        assert_eq!(json, "\"GET\"");
        let json = serde_json::to_string(&Method::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
    }

    #[test]
    fn test_freshness_windows_ordered() {
        let config = FreshnessConfig::default();
        assert!(config.window(CacheTier::Fast) < config.window(CacheTier::Standard));
        assert!(config.window(CacheTier::Standard) < config.window(CacheTier::Slow));
    }

    #[test]
    fn test_config_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_concurrency, 6);
        assert_eq!(config.auth_path_prefix, "/api/auth");
    }

    #[test]
    fn test_error_status() {
        assert_eq!(GatewayError::authentication("nope").status(), Some(401));
        assert_eq!(GatewayError::not_found("gone").status(), Some(404));
        assert_eq!(GatewayError::transient("busy").status(), None);
        assert_eq!(GatewayError::fatal(Some(500), "boom").status(), Some(500));
    }

    #[test]
    fn test_error_retryable() {
        assert!(GatewayError::transient("503").is_retryable());
        assert!(!GatewayError::authentication("nope").is_retryable());
        assert!(!GatewayError::not_found("gone").is_retryable());
        assert!(!GatewayError::fatal(None, "boom").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::authentication("Not authenticated");
        assert!(err.to_string().contains("Not authenticated"));
        assert!(err.to_string().contains("401"));
    }
}
