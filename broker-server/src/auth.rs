//! Credential set and the auth middleware that gates every `/task*` and
//! `/lock` route.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid basic auth entry {0:?}, expected \"user:pass\"")]
    InvalidBasicAuth(String),
}

/// The set of `Authorization` header values the broker will accept. Empty
/// means auth is disabled: every request passes.
#[derive(Debug, Default, Clone)]
pub struct Credentials(HashSet<String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_basic(&mut self, entries: &[String]) -> Result<(), ConfigError> {
        for entry in entries {
            let (user, pass) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidBasicAuth(entry.clone()))?;
            let encoded = STANDARD.encode(format!("{user}:{pass}"));
            self.0.insert(format!("Basic {encoded}"));
        }
        Ok(())
    }

    pub fn add_bearer(&mut self, entries: &[String]) {
        for entry in entries {
            self.0.insert(format!("Bearer {entry}"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn allows(&self, header: Option<&str>) -> bool {
        self.0.is_empty() || header.is_some_and(|h| self.0.contains(h))
    }
}

/// Axum middleware rejecting requests whose `Authorization` header is not in
/// the configured credential set (a no-op when the set is empty).
pub async fn require_auth(
    State(credentials): State<Arc<Credentials>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !credentials.allows(header_value) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "request with invalid auth credentials blocked"
        );
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credentials_allow_everything() {
        let creds = Credentials::new();
        assert!(creds.allows(None));
        assert!(creds.allows(Some("anything")));
    }

    #[test]
    fn basic_auth_round_trip() {
        let mut creds = Credentials::new();
        creds.add_basic(&["alice:secret".to_string()]).unwrap();
        assert!(creds.allows(Some("Basic YWxpY2U6c2VjcmV0")));
        assert!(!creds.allows(Some("Basic bm9wZQ==")));
        assert!(!creds.allows(None));
    }

    #[test]
    fn malformed_basic_entry_is_a_config_error() {
        let mut creds = Credentials::new();
        let err = creds.add_basic(&["no-colon-here".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBasicAuth(_)));
    }

    #[test]
    fn bearer_auth() {
        let mut creds = Credentials::new();
        creds.add_bearer(&["tok123".to_string()]);
        assert!(creds.allows(Some("Bearer tok123")));
        assert!(!creds.allows(Some("Bearer wrong")));
    }
}
