//! Authentication operations
//!
//! The login/logout/verify/me endpoints run through the normal gateway
//! pipeline; login seeds the session store from the response token and
//! logout clears it whatever the backend says.

use aurora_common::Result;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::gateway::ApiGateway;

/// Response fields that may carry the bearer credential
const TOKEN_FIELDS: &[&str] = &["token", "access_token", "session_token"];

fn extract_token(value: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

impl ApiGateway {
    fn auth_path(&self, leaf: &str) -> String {
        format!("{}/{}", self.config().auth_path_prefix, leaf)
    }

    /// Authenticate and seed the session store from the response token
    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        let body = json!({"username": username, "password": password});
        let value = self.post(self.auth_path("login"), body).await?;

        match extract_token(&value) {
            Some(token) => {
                self.set_session(&token);
                info!("Session established");
            }
            None => warn!("Login response carried no session token"),
        }
        Ok(value)
    }

    /// End the session. The local credential is cleared even when the
    /// backend call fails; a dead session is no reason to stay logged in.
    pub async fn logout(&self) -> Result<()> {
        let result = self.post(self.auth_path("logout"), json!({})).await;
        self.clear_session();
        result.map(|_| ())
    }

    /// Ask the backend whether the current credential is still valid
    pub async fn verify(&self) -> Result<Value> {
        self.get(self.auth_path("verify")).await
    }

    /// Profile of the authenticated user
    pub async fn me(&self) -> Result<Value> {
        self.get(self.auth_path("me")).await
    }
}
