use axum::{
    http::{header, HeaderName},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::mcp::{self, protocol::SESSION_HEADER};
use crate::AppState;

/// CORS for browser-based MCP clients; the session header must be readable
fn cors_layer() -> CorsLayer {
    let session_header = HeaderName::from_static(SESSION_HEADER);

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CACHE_CONTROL,
            HeaderName::from_static("mcp-protocol-version"),
            session_header.clone(),
        ])
        .expose_headers([session_header])
        .max_age(Duration::from_secs(3600))
}

pub fn build_router(state: AppState) -> Router {
    let mcp_routes = Router::new()
        .route(
            "/mcp",
            get(mcp::handle_get)
                .post(mcp::handle_post)
                .delete(mcp::handle_delete),
        )
        .layer(cors_layer());

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .merge(mcp_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
