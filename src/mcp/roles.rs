//! Role extraction at session bootstrap
//!
//! Roles are resolved once, when `initialize` creates a session, and bound to
//! the session's dispatch target. Token validation happens upstream: the
//! reverse proxy that authenticated the caller forwards the granted roles in
//! a trusted header.

use async_trait::async_trait;
use axum::http::{header::InvalidHeaderName, HeaderMap, HeaderName};

#[async_trait]
pub trait RoleExtractor: Send + Sync {
    /// Roles granted to the caller that sent `headers`
    async fn extract(&self, headers: &HeaderMap) -> Vec<String>;
}

/// Reads a comma-separated role list from a configured header
#[derive(Debug, Clone)]
pub struct HeaderRoleExtractor {
    header: HeaderName,
}

impl HeaderRoleExtractor {
    pub fn new(header: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            header: HeaderName::from_bytes(header.trim().to_ascii_lowercase().as_bytes())?,
        })
    }
}

#[async_trait]
impl RoleExtractor for HeaderRoleExtractor {
    async fn extract(&self, headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(&self.header)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_role_list)
            .collect()
    }
}

/// Splits `"a, b,,c"` into `["a", "b", "c"]`
pub fn parse_role_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}
