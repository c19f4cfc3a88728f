use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::mcp::SERVICE_NAME;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub providers: BTreeMap<String, bool>,
    pub sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub mcp: &'static str,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        providers: state.providers.check_all_credentials(),
        sessions: state.sessions.count(),
    })
}

/// GET /
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        mcp: "/mcp",
    })
}
