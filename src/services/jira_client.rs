//! HTTP client for the JIRA Cloud REST API (v3)
//!
//! Thin wrapper over `reqwest` that applies basic auth, JSON headers and
//! timeouts, and turns non-2xx responses into [`JiraError::Status`].
//!
//! # Example
//!
//! ```rust,no_run
//! use gl_mcp::services::{JiraClient, JiraCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = JiraClient::new(JiraCredentials {
//!     base_url: "https://example.atlassian.net".to_string(),
//!     username: "bot@example.com".to_string(),
//!     api_token: "token".to_string(),
//! });
//!
//! let me = client.myself().await?;
//! println!("Connected as {}", me["displayName"]);
//! # Ok(())
//! # }
//! ```

use crate::config::Settings;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

/// Timeout of the credential probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout of every tool request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while talking to JIRA
#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JIRA returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Invalid issue key: {0:?}")]
    InvalidIssueKey(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JiraCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

impl JiraCredentials {
    /// `None` unless URL, username and token are all configured
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.jira_url.trim().is_empty()
            || settings.jira_username.is_empty()
            || settings.jira_api_token.is_empty()
        {
            return None;
        }

        Some(Self {
            base_url: settings.jira_url.trim().trim_end_matches('/').to_string(),
            username: settings.jira_username.clone(),
            api_token: settings.jira_api_token.clone(),
        })
    }
}

/// Safe to share across tasks; `reqwest::Client` pools connections
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    credentials: JiraCredentials,
}

impl JiraClient {
    pub fn new(credentials: JiraCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            credentials: JiraCredentials {
                base_url: credentials.base_url.trim_end_matches('/').to_string(),
                ..credentials
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }

    fn builder(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.credentials.base_url, endpoint))
            .basic_auth(&self.credentials.username, Some(&self.credentials.api_token))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, JiraError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(JiraError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(&body).map_err(|e| JiraError::InvalidResponse(e.to_string()))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, JiraError> {
        let mut request = self.builder(method, endpoint).timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    /// Probes the credentials; the authenticated user on success
    pub async fn myself(&self) -> Result<Value, JiraError> {
        let request = self
            .builder(Method::GET, "/rest/api/3/myself")
            .timeout(PROBE_TIMEOUT);
        self.send(request).await
    }

    pub async fn search_issues(&self, jql: &str, max_results: u32) -> Result<Value, JiraError> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": ["key", "summary", "status", "priority", "created"],
        });
        self.request(Method::POST, "/rest/api/3/search/jql", Some(&body))
            .await
    }

    pub async fn get_issue(&self, issue_key: &str) -> Result<Value, JiraError> {
        let key = checked_issue_key(issue_key)?;
        self.request(Method::GET, &format!("/rest/api/3/issue/{}", key), None)
            .await
    }

    pub async fn create_issue(&self, fields: Value) -> Result<Value, JiraError> {
        self.request(Method::POST, "/rest/api/3/issue", Some(&json!({ "fields": fields })))
            .await
    }

    pub async fn add_comment(&self, issue_key: &str, body: Value) -> Result<Value, JiraError> {
        let key = checked_issue_key(issue_key)?;
        self.request(
            Method::POST,
            &format!("/rest/api/3/issue/{}/comment", key),
            Some(&json!({ "body": body })),
        )
        .await
    }

    pub async fn transitions(&self, issue_key: &str) -> Result<Value, JiraError> {
        let key = checked_issue_key(issue_key)?;
        self.request(
            Method::GET,
            &format!("/rest/api/3/issue/{}/transitions", key),
            None,
        )
        .await
    }

    pub async fn transition(&self, issue_key: &str, transition_id: &str) -> Result<Value, JiraError> {
        let key = checked_issue_key(issue_key)?;
        self.request(
            Method::POST,
            &format!("/rest/api/3/issue/{}/transitions", key),
            Some(&json!({ "transition": { "id": transition_id } })),
        )
        .await
    }
}

/// Issue keys end up in the request path
fn checked_issue_key(issue_key: &str) -> Result<&str, JiraError> {
    let key = issue_key.trim();
    if key.is_empty() || key.contains(['/', '?', '#', '%']) || key.contains("..") {
        return Err(JiraError::InvalidIssueKey(issue_key.to_string()));
    }
    Ok(key)
}
