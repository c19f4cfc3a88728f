//! Integration tests for the MCP session lifecycle over `POST`/`DELETE /mcp`

mod common;

use axum::{
    body::Body,
    http::{Method, StatusCode},
};
use common::*;
use gl_mcp::mcp::HeaderRoleExtractor;
use gl_mcp::providers::JiraProvider;
use gl_mcp::routes::build_router;
use gl_mcp::test_utils::test_helpers::{self, StaticProvider};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn initialize_then_list_call_and_terminate() {
    let state = test_helpers::test_state();
    state
        .providers
        .register(Arc::new(JiraProvider::with_credentials(None)));
    state.providers.initialize_all(None).await;
    let app = build_router(state);

    let response = post(&app, None, rpc(1, "initialize", json!({"clientInfo": {"name": "test"}}))).await;
    assert_eq!(response.status, StatusCode::OK);
    let session_id = response.session_id().expect("Missing session header");
    let body = response.json();
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["serverInfo"]["name"], "gl-mcp");
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");

    let response = post(&app, Some(&session_id), rpc(2, "tools/list", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.session_id().as_deref(), Some(session_id.as_str()));
    assert_eq!(response.json()["result"]["tools"], json!([]));

    let response = post(
        &app,
        Some(&session_id),
        rpc(
            3,
            "tools/call",
            json!({"name": "jira_search_issues", "arguments": {"jql": "project = X"}}),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(tool_text(&response.json()), "Unknown tool: jira_search_issues");

    let response = delete(&app, Some(&session_id)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = post(&app, Some(&session_id), rpc(4, "ping", json!({}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 4);
}

#[tokio::test]
async fn every_initialize_allocates_a_fresh_session() {
    let app = build_router(test_helpers::test_state());

    let mut seen = HashSet::new();
    for _ in 0..5 {
        assert!(seen.insert(initialize(&app).await));
    }
}

#[tokio::test]
async fn initialize_with_unknown_session_header_creates_a_new_session() {
    let app = build_router(test_helpers::test_state());

    let response = post(&app, Some("stale-id"), rpc(1, "initialize", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    let session_id = response.session_id().expect("Missing session header");
    assert_ne!(session_id, "stale-id");
}

#[tokio::test]
async fn methods_without_a_session_are_rejected() {
    let app = build_router(test_helpers::test_state());

    for (index, method) in ["tools/list", "tools/call", "ping", "initialized", "no/such/method"]
        .into_iter()
        .enumerate()
    {
        for session_id in [None, Some("not-a-session")] {
            let id = index as i64 + 10;
            let response = post(&app, session_id, rpc(id, method, json!({}))).await;
            assert_eq!(response.status, StatusCode::BAD_REQUEST, "method {}", method);

            let body = response.json();
            assert_eq!(body["error"]["code"], -32600, "method {}", method);
            assert_eq!(body["error"]["message"], "Invalid session");
            assert_eq!(body["id"], id);
        }
    }
}

#[tokio::test]
async fn ping_always_returns_an_empty_result() {
    let app = build_router(test_helpers::demo_state().await);
    let session_id = initialize(&app).await;

    post(&app, Some(&session_id), rpc(2, "tools/list", json!({}))).await;
    post(
        &app,
        Some(&session_id),
        rpc(3, "tools/call", json!({"name": "demo_fail"})),
    )
    .await;

    let response = post(&app, Some(&session_id), rpc(99, "ping", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"jsonrpc": "2.0", "id": 99, "result": {}})
    );
}

#[tokio::test]
async fn tools_are_listed_with_namespaced_names_and_schemas() {
    let app = build_router(test_helpers::demo_state().await);
    let session_id = initialize(&app).await;

    let response = post(&app, Some(&session_id), rpc(2, "tools/list", json!({}))).await;
    let tools = response.json()["result"]["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();

    assert_eq!(names, vec!["demo_echo", "demo_fail"]);
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["text"]));
    assert_eq!(tools[0]["description"], "Echo the text argument");
}

#[tokio::test]
async fn tool_results_and_failures_are_successful_responses() {
    let app = build_router(test_helpers::demo_state().await);
    let session_id = initialize(&app).await;

    let response = post(
        &app,
        Some(&session_id),
        rpc(2, "tools/call", json!({"name": "demo_echo", "arguments": {"text": "hello"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(tool_text(&response.json()), "hello");

    let response = post(
        &app,
        Some(&session_id),
        rpc(3, "tools/call", json!({"name": "demo_fail", "arguments": {}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert!(body.get("error").is_none());
    let text = tool_text(&body);
    assert!(text.starts_with("Error:"), "unexpected text {:?}", text);
    assert!(text.contains("upstream unavailable"));
}

#[tokio::test]
async fn unknown_methods_are_method_not_found() {
    let app = build_router(test_helpers::test_state());
    let session_id = initialize(&app).await;

    let response = post(&app, Some(&session_id), rpc(5, "resources/list", json!({}))).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "Method not found: resources/list");
}

#[tokio::test]
async fn initialized_notification_is_accepted_without_body() {
    let app = build_router(test_helpers::test_state());
    let session_id = initialize(&app).await;

    let response = post(
        &app,
        Some(&session_id),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert!(response.body.is_empty());
    assert_eq!(response.session_id().as_deref(), Some(session_id.as_str()));
}

#[tokio::test]
async fn null_ids_are_answered_with_a_null_id() {
    let app = build_router(test_helpers::demo_state().await);
    let session_id = initialize(&app).await;

    let response = post(
        &app,
        Some(&session_id),
        json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["jsonrpc"], "2.0");
    assert!(body.as_object().unwrap().contains_key("id"));
    assert_eq!(body["id"], serde_json::Value::Null);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_bodies_are_parse_errors() {
    let app = build_router(test_helpers::test_state());

    for body in ["{not json", "[]", "{\"id\": 1}"] {
        let response = post_raw(&app, None, body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {}", body);
        let json = response.json();
        assert_eq!(json["error"]["code"], -32700);
        assert_eq!(json["id"], serde_json::Value::Null);
    }
}

#[tokio::test]
async fn invalid_call_params_are_internal_errors() {
    let app = build_router(test_helpers::demo_state().await);
    let session_id = initialize(&app).await;

    let response = post(
        &app,
        Some(&session_id),
        rpc(7, "tools/call", json!({"name": "demo_echo", "arguments": "text"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"]["code"], -32603);
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn delete_requires_a_known_session() {
    let app = build_router(test_helpers::test_state());

    let response = delete(&app, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "Invalid or missing session ID");

    let response = delete(&app, Some("unknown")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let session_id = initialize(&app).await;
    assert_eq!(delete(&app, Some(&session_id)).await.status, StatusCode::OK);
    assert_eq!(
        delete(&app, Some(&session_id)).await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn sessions_only_see_tools_their_roles_permit() {
    let state = test_helpers::test_state()
        .with_role_extractor(Arc::new(HeaderRoleExtractor::new("x-user-roles").unwrap()));
    state.providers.register(Arc::new(
        StaticProvider::new("jira", true).with_required_role("gl-admin"),
    ));
    state
        .providers
        .register(Arc::new(StaticProvider::new("open", true)));
    state.providers.initialize_all(None).await;
    let app = build_router(state);

    let mut request = mcp_request(
        Method::POST,
        None,
        Body::from(rpc(1, "initialize", json!({})).to_string()),
    );
    request
        .headers_mut()
        .insert("x-user-roles", "gl-viewer".parse().unwrap());
    let viewer = send(&app, request).await.session_id().unwrap();

    let response = post(&app, Some(&viewer), rpc(2, "tools/list", json!({}))).await;
    let names: Vec<String> = response.json()["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["open_echo", "open_fail"]);

    let response = post(
        &app,
        Some(&viewer),
        rpc(3, "tools/call", json!({"name": "jira_echo", "arguments": {"text": "hi"}})),
    )
    .await;
    assert_eq!(tool_text(&response.json()), "Unknown tool: jira_echo");

    let mut request = mcp_request(
        Method::POST,
        None,
        Body::from(rpc(1, "initialize", json!({})).to_string()),
    );
    request
        .headers_mut()
        .insert("x-user-roles", "gl-admin, gl-viewer".parse().unwrap());
    let admin = send(&app, request).await.session_id().unwrap();

    let response = post(
        &app,
        Some(&admin),
        rpc(4, "tools/call", json!({"name": "jira_echo", "arguments": {"text": "hi"}})),
    )
    .await;
    assert_eq!(tool_text(&response.json()), "hi");
}
