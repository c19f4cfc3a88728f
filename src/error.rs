use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use thiserror::Error;

use crate::mcp::protocol::{JsonRpcResponse, INTERNAL_ERROR};

/// Error types for MCP dispatch
///
/// These cover failures while executing a recognized method. Tool-domain
/// failures never show up here; the tool registry turns them into content.
/// Every variant is reported to the client as JSON-RPC `-32603`.
#[derive(Debug, Error)]
pub enum McpServiceError {
    /// `params` could not be read as the method's parameter shape
    #[error("Invalid params: {0}")]
    InvalidParams(serde_json::Error),

    /// A result could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl McpServiceError {
    pub fn code(&self) -> i64 {
        INTERNAL_ERROR
    }

    /// JSON-RPC envelope for this error, echoing the request id
    pub fn to_response(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.code(), self.to_string())
    }
}

/// Rejections produced by the `/mcp` endpoint before or around dispatch
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Parse error")]
    Parse,

    #[error("Invalid session")]
    InvalidSession { id: Value },

    #[error("{source}")]
    Dispatch {
        id: Value,
        #[source]
        source: McpServiceError,
    },

    #[error("Invalid or missing session ID")]
    UnknownSession,

    #[error("SSE not accepted")]
    EventStreamNotAccepted,
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        match self {
            TransportError::Parse => {
                (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::parse_error())).into_response()
            }
            TransportError::InvalidSession { id } => (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::invalid_session(id)),
            )
                .into_response(),
            TransportError::Dispatch { id, source } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(source.to_response(id)),
            )
                .into_response(),
            TransportError::UnknownSession => {
                (StatusCode::BAD_REQUEST, "Invalid or missing session ID").into_response()
            }
            TransportError::EventStreamNotAccepted => {
                (StatusCode::METHOD_NOT_ALLOWED, "SSE not accepted").into_response()
            }
        }
    }
}

/// Invalid process settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid roles header name: {0}")]
    InvalidRolesHeader(String),
}
