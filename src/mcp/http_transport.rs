//! Streamable HTTP transport handler for MCP
//!
//! One logical endpoint, three verbs:
//!
//! - `POST /mcp` - send a JSON-RPC message, receive the JSON-RPC response
//! - `GET /mcp` - open the session's push stream (`text/event-stream`)
//! - `DELETE /mcp` - terminate the session
//!
//! Session identity travels in the `mcp-session-id` header. Only an
//! `initialize` request may arrive without a known session; it creates one.
//!
//! # Usage
//!
//! ```http
//! POST /mcp
//! Content-Type: application/json
//!
//! {"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}
//! ```
//!
//! Response:
//! ```http
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//! mcp-session-id: 3f9a...
//!
//! {"jsonrpc":"2.0","id":1,"result":{...}}
//! ```

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{sse::Sse, IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::TransportError;
use crate::mcp::protocol::{JsonRpcRequest, McpMethod, EVENT_STREAM_MEDIA_TYPE, SESSION_HEADER};
use crate::mcp::service::GatewayService;
use crate::mcp::session::Session;
use crate::mcp::sse;
use crate::AppState;

/// Session id presented by the client, if any
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|accept| accept.contains(EVENT_STREAM_MEDIA_TYPE))
}

fn session_headers(session: &Session) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // Ids are hex, always a valid header value
    if let Ok(value) = HeaderValue::from_str(session.id()) {
        headers.insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    headers
}

/// Resolves the session for a request, creating one for `initialize`
async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
    request: &JsonRpcRequest,
) -> Result<Arc<Session>, TransportError> {
    if let Some(session) = session_id_from(headers).and_then(|id| state.sessions.get(id)) {
        return Ok(session);
    }

    if request.mcp_method() != McpMethod::Initialize {
        tracing::warn!(
            method = %request.method,
            presented = session_id_from(headers).is_some(),
            "Rejected request without a valid session"
        );
        return Err(TransportError::InvalidSession {
            id: request.response_id(),
        });
    }

    let roles = match &state.role_extractor {
        Some(extractor) => Some(extractor.extract(headers).await),
        None => None,
    };
    let service = GatewayService::new(Arc::clone(&state.tools), roles);

    Ok(state.sessions.create(service))
}

/// POST /mcp - JSON-RPC message exchange
///
/// # Returns
///
/// * `200 OK` with the JSON-RPC response
/// * `202 Accepted` with no body for notifications
/// * `400 Bad Request` with `-32700` when the body is not a JSON-RPC request
/// * `400 Bad Request` with `-32600` when no session can be resolved
/// * `500 Internal Server Error` with `-32603` when dispatch fails
pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, TransportError> {
    let request = JsonRpcRequest::parse(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse MCP message");
        TransportError::Parse
    })?;

    let session = resolve_session(&state, &headers, &request).await?;

    tracing::debug!(session_id = %session.id(), method = %request.method, "Received MCP message");

    let response = session
        .service()
        .handle_request(&request)
        .await
        .map_err(|source| {
            tracing::error!(
                session_id = %session.id(),
                method = %request.method,
                id = %request.response_id(),
                error = %source,
                "Error processing MCP message"
            );
            TransportError::Dispatch {
                id: request.response_id(),
                source,
            }
        })?;

    let headers = session_headers(&session);

    Ok(match response {
        Some(response) => (StatusCode::OK, headers, Json(response)).into_response(),
        None => (StatusCode::ACCEPTED, headers).into_response(),
    })
}

/// GET /mcp - open the streaming channel of an active session
///
/// Requires a known session and an `Accept` header that includes
/// `text/event-stream`.
pub async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, TransportError> {
    let session = session_id_from(&headers)
        .and_then(|id| state.sessions.get(id))
        .ok_or(TransportError::UnknownSession)?;

    if !accepts_event_stream(&headers) {
        return Err(TransportError::EventStreamNotAccepted);
    }

    let mut response_headers = session_headers(&session);
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    let stream = sse::event_stream(&session);
    let keep_alive = sse::keep_alive(state.settings.sse_keep_alive);

    Ok((response_headers, Sse::new(stream).keep_alive(keep_alive)).into_response())
}

/// DELETE /mcp - terminate a session
pub async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, TransportError> {
    let id = session_id_from(&headers).ok_or(TransportError::UnknownSession)?;

    match state.sessions.remove(id) {
        Some(_) => Ok(StatusCode::OK),
        None => Err(TransportError::UnknownSession),
    }
}
