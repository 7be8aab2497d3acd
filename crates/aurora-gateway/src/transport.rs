//! Transport strategies
//!
//! The gateway's contract is identical regardless of how requests reach the
//! backend. Three strategies cover the deployment variants: direct calls to
//! the upstream host, calls routed through a server-side relay function,
//! and direct-with-relay-fallback for environments where direct calls may
//! be refused.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aurora_common::{GatewayConfig, GatewayError, Method, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::classify::RawResponse;

/// One concrete dispatch handed to a transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub path: String,
    pub method: Method,
    pub body: Option<Value>,
    pub bearer: Option<String>,
    /// Per-call timeout override; the client default applies when unset
    pub timeout: Option<Duration>,
}

/// Delivery seam between the gateway and the wire.
///
/// Implementations never fail at the call boundary: transport-level
/// problems are reported as `RawResponse::TransportError` so the
/// classification rules apply uniformly.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> RawResponse;
}

fn build_client(config: &GatewayConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| GatewayError::transport(format!("failed to build HTTP client: {}", e)))
}

fn to_http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timeout: {}", error)
    } else if error.is_connect() {
        format!("network error: {}", error)
    } else {
        error.to_string()
    }
}

/// Interpret a response body: JSON where possible, raw text otherwise
fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

async fn read_response(response: reqwest::Response) -> RawResponse {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(text) => RawResponse::Upstream {
            status: Some(status),
            body: parse_body(&text),
        },
        Err(e) => RawResponse::TransportError {
            message: format!("failed to read response body: {}", e),
            timed_out: e.is_timeout(),
        },
    }
}

// ============================================================================
// Direct Transport
// ============================================================================

/// Direct calls against the upstream base URL with a bearer credential
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &TransportRequest) -> RawResponse {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(to_http_method(request.method), &url);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        match builder.send().await {
            Ok(response) => read_response(response).await,
            Err(e) => RawResponse::TransportError {
                message: describe_reqwest_error(&e),
                timed_out: e.is_timeout(),
            },
        }
    }
}

// ============================================================================
// Relay Transport
// ============================================================================

/// Envelope forwarded to the relay function
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayEnvelope<'a> {
    path: &'a str,
    method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<&'a str>,
}

/// Calls routed through a server-side relay that forwards
/// `{path, method, body, sessionToken}` and returns the upstream JSON or
/// an `{error}` envelope
pub struct RelayTransport {
    client: reqwest::Client,
    relay_url: String,
}

impl RelayTransport {
    pub fn new(relay_url: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            relay_url: relay_url.into(),
        })
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn send(&self, request: &TransportRequest) -> RawResponse {
        let envelope = RelayEnvelope {
            path: &request.path,
            method: request.method,
            body: request.body.as_ref(),
            session_token: request.bearer.as_deref(),
        };

        let mut builder = self.client.post(&self.relay_url).json(&envelope);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        match builder.send().await {
            Ok(response) => read_response(response).await,
            Err(e) => RawResponse::TransportError {
                message: describe_reqwest_error(&e),
                timed_out: e.is_timeout(),
            },
        }
    }
}

// ============================================================================
// Hybrid Transport
// ============================================================================

/// Primary transport with fallback to a secondary on connection-level
/// failure. Timeouts do not fall back: a slow backend degrades instead of
/// doubling the wait.
pub struct FallbackTransport {
    primary: Arc<dyn Transport>,
    secondary: Arc<dyn Transport>,
}

impl FallbackTransport {
    pub fn new(primary: Arc<dyn Transport>, secondary: Arc<dyn Transport>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn send(&self, request: &TransportRequest) -> RawResponse {
        match self.primary.send(request).await {
            RawResponse::TransportError { message, timed_out } if !timed_out => {
                warn!(
                    path = %request.path,
                    error = %message,
                    "Primary transport failed, falling back to secondary"
                );
                self.secondary.send(request).await
            }
            other => other,
        }
    }
}
