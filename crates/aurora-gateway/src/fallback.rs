//! Shape-appropriate empty values for degraded responses
//!
//! When a request degrades (timeout, upstream 500, retryable error
//! envelope), callers receive an empty value matching the shape the
//! endpoint would have produced, so rendering code needs no null-checks
//! when the backend is unhealthy.

use serde_json::Value;

/// Path substrings identifying endpoints that return collections
const LIST_MARKERS: &[&str] = &[
    "/list",
    "/vessels",
    "/stations",
    "/beacons",
    "/aircraft",
    "/devices",
    "/active",
    "/readings",
    "/rules",
    "/profiles",
    "/violations",
    "/baselines",
    "/clients",
    "/sensors",
    "/alerts",
];

/// Path substrings identifying endpoints that return aggregate objects
const OBJECT_MARKERS: &[&str] = &["/stats", "/statistics", "/overview"];

/// Empty value matching the response shape of `path`
pub fn empty_value_for(path: &str) -> Value {
    if LIST_MARKERS.iter().any(|marker| path.contains(marker)) {
        return Value::Array(Vec::new());
    }
    if OBJECT_MARKERS.iter().any(|marker| path.contains(marker)) {
        return Value::Object(serde_json::Map::new());
    }
    Value::Null
}
