//! MCP session and message-dispatch layer
//!
//! # Architecture
//!
//! - [`ToolRegistry`] - tools registered by providers, shared by all sessions
//! - [`SessionStore`] - concurrent map of active sessions
//! - [`GatewayService`] - per-session JSON-RPC dispatch target
//! - [`sse`] - per-session push stream with keep-alive
//! - [`http_transport`] - axum handlers for `POST`/`GET`/`DELETE /mcp`
//!
//! # Example
//!
//! ```rust
//! use gl_mcp::mcp::{GatewayService, SessionStore, ToolRegistry};
//! use std::sync::Arc;
//!
//! let tools = Arc::new(ToolRegistry::new());
//! let sessions = SessionStore::new();
//!
//! let session = sessions.create(GatewayService::new(tools, None));
//! assert!(sessions.get(session.id()).is_some());
//! ```

pub mod http_transport;
pub mod protocol;
pub mod registry;
pub mod roles;
pub mod service;
pub mod session;
pub mod sse;

pub use http_transport::{handle_delete, handle_get, handle_post};
pub use registry::{ToolDefinition, ToolHandler, ToolOutput, ToolRegistry};
pub use roles::{HeaderRoleExtractor, RoleExtractor};
pub use service::{GatewayService, ServerInfo, SERVICE_NAME};
pub use session::{Session, SessionStore, SharedSessionStore};
