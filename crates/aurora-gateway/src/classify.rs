//! Response classification
//!
//! Maps a raw transport result to a typed outcome driving the dispatch
//! loop: retry with backoff, degrade to an empty value, fail with a
//! classified error, or succeed. Classification prefers structured status
//! codes where the transport exposes them; substring matching on error
//! text is the fallback for transports that only report free-text failures.

use aurora_common::GatewayError;
use serde_json::Value;
use tracing::{debug, error};

/// Raw result handed back by a transport
#[derive(Debug, Clone)]
pub enum RawResponse {
    /// The transport delivered an upstream response, whatever its status
    Upstream { status: Option<u16>, body: Value },
    /// The transport itself failed before any upstream response existed
    TransportError { message: String, timed_out: bool },
}

/// Classified outcome of one dispatch attempt
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Value),
    /// Back off and retry, attempts permitting
    Retry(GatewayError),
    /// Resolve to the shape-appropriate empty value without retrying
    Degrade(GatewayError),
    /// Propagate to the caller
    Fail(GatewayError),
}

/// Transport-level error texts worth retrying
const RETRY_MARKERS: &[&str] = &[
    "503",
    "504",
    "boot_error",
    "function failed to start",
    "network",
    "unavailable",
    "retryable",
];

/// `detail` texts indicating an invalid or missing credential
const AUTH_MARKERS: &[&str] = &["not authenticated", "invalid session", "provide x-api-key"];

/// `error` envelope texts indicating a transient backend condition
const TRANSIENT_ENVELOPE_MARKERS: &[&str] =
    &["temporarily unavailable", "timeout", "internal server error"];

fn matches_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

fn is_not_found_text(text: &str) -> bool {
    text.contains("not found") || (text.contains("no ") && text.contains(" found"))
}

/// Classify one raw transport result for the request at `path`
pub fn classify(path: &str, raw: RawResponse) -> Outcome {
    match raw {
        RawResponse::TransportError { message, timed_out } => {
            classify_transport_error(path, message, timed_out)
        }
        RawResponse::Upstream { status, body } => classify_upstream(path, status, body),
    }
}

fn classify_transport_error(path: &str, message: String, timed_out: bool) -> Outcome {
    let lower = message.to_lowercase();

    // A slow backend should degrade, not compound latency with retries
    if timed_out || lower.contains("timeout") {
        return Outcome::Degrade(GatewayError::transient(message));
    }

    // An upstream 500 is not expected to self-heal within the retry window
    if lower.contains("500") {
        return Outcome::Degrade(GatewayError::transient(message));
    }

    if matches_any(&lower, RETRY_MARKERS) {
        return Outcome::Retry(GatewayError::transient(message));
    }

    error!(path = %path, error = %message, "Transport failure");
    Outcome::Fail(GatewayError::fatal(None, message))
}

fn classify_upstream(path: &str, status: Option<u16>, body: Value) -> Outcome {
    let detail = body
        .get("detail")
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    let detail_lower = detail.as_deref().map(|s| s.to_lowercase());

    // Credential problems, by status or by detail text
    let auth_by_status = matches!(status, Some(401) | Some(403));
    let auth_by_detail = detail_lower
        .as_deref()
        .map(|d| matches_any(d, AUTH_MARKERS))
        .unwrap_or(false);
    if auth_by_status || auth_by_detail {
        let message = detail.unwrap_or_else(|| "authentication required".to_string());
        let status = match status {
            Some(s @ (401 | 403)) => s,
            _ => 401,
        };
        return Outcome::Fail(GatewayError::Authentication { status, message });
    }

    // Absent resources are expected; keep them out of error-level logs
    let not_found_by_status = status == Some(404);
    let not_found_by_detail = detail_lower
        .as_deref()
        .map(is_not_found_text)
        .unwrap_or(false);
    if not_found_by_status || not_found_by_detail {
        let message = detail.unwrap_or_else(|| "resource not found".to_string());
        debug!(path = %path, message = %message, "Resource not found");
        return Outcome::Fail(GatewayError::not_found(message));
    }

    if let Some(message) = detail {
        error!(path = %path, status = ?status, detail = %message, "Backend reported an error");
        return Outcome::Fail(GatewayError::fatal(status, message));
    }

    // Wrapped error envelope: {"error": ..., "retryable": ...}
    if let Some(err_field) = body.get("error") {
        let message = err_field
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| err_field.to_string());
        let flagged_retryable = body
            .get("retryable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if flagged_retryable || matches_any(&message.to_lowercase(), TRANSIENT_ENVELOPE_MARKERS) {
            return Outcome::Degrade(GatewayError::transient(message));
        }
        error!(path = %path, status = ?status, error = %message, "Backend error envelope");
        return Outcome::Fail(GatewayError::fatal(status, message));
    }

    // Bare 5xx with no recognizable body: worth a retry
    if let Some(s) = status {
        if s >= 500 {
            return Outcome::Retry(GatewayError::transient(format!("upstream status {}", s)));
        }
        if !(200..300).contains(&s) {
            error!(path = %path, status = s, "Unexpected upstream status");
            return Outcome::Fail(GatewayError::fatal(Some(s), format!("upstream status {}", s)));
        }
    }

    Outcome::Success(body)
}
