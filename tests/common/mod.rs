//! Shared request helpers for the HTTP-level tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

pub const SESSION_HEADER: &str = "mcp-session-id";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn session_id(&self) -> Option<String> {
        self.headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Router should not fail");

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn mcp_request(method: Method, session_id: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session_id {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(body).expect("Failed to build request")
}

pub async fn post_raw(app: &Router, session_id: Option<&str>, body: &str) -> TestResponse {
    send(
        app,
        mcp_request(Method::POST, session_id, Body::from(body.to_string())),
    )
    .await
}

pub async fn post(app: &Router, session_id: Option<&str>, message: Value) -> TestResponse {
    post_raw(app, session_id, &message.to_string()).await
}

pub fn rpc(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

/// Runs `initialize` and returns the new session id
pub async fn initialize(app: &Router) -> String {
    let response = post(app, None, rpc(1, "initialize", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    response
        .session_id()
        .expect("initialize should return a session id")
}

pub async fn delete(app: &Router, session_id: Option<&str>) -> TestResponse {
    send(app, mcp_request(Method::DELETE, session_id, Body::empty())).await
}

/// First text item of a `tools/call` result
pub fn tool_text(response: &Value) -> String {
    response["result"]["content"][0]["text"]
        .as_str()
        .expect("Tool result should carry text content")
        .to_string()
}
