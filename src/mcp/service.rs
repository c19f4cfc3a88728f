//! JSON-RPC dispatch for one MCP session
//!
//! A [`GatewayService`] is the dispatch target bound to a session at
//! `initialize` time. It holds a handle to the shared [`ToolRegistry`] plus
//! the role set granted to the session, and routes every recognized method:
//!
//! | method        | result                                   |
//! |---------------|------------------------------------------|
//! | `initialize`  | protocol version, server info, capabilities |
//! | `initialized` | none (notification)                      |
//! | `tools/list`  | tools visible to the session             |
//! | `tools/call`  | content produced by the tool registry    |
//! | `ping`        | `{}`                                     |
//! | anything else | `-32601` method not found                |
//!
//! Requests without an id are notifications and never produce a body.

use crate::error::McpServiceError;
use crate::mcp::protocol::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, McpMethod, METHOD_NOT_FOUND,
    PROTOCOL_VERSION,
};
use crate::mcp::registry::ToolRegistry;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Name announced in `serverInfo` and on the health endpoint
pub const SERVICE_NAME: &str = "gl-mcp";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GatewayService {
    tools: Arc<ToolRegistry>,
    roles: Option<Vec<String>>,
    info: ServerInfo,
}

impl GatewayService {
    /// Binds a dispatch target to the shared registry
    ///
    /// `roles` of `None` means the session is unrestricted.
    pub fn new(tools: Arc<ToolRegistry>, roles: Option<Vec<String>>) -> Self {
        tracing::debug!(tools = tools.len(), roles = ?roles, "Created MCP dispatch target");
        Self {
            tools,
            roles,
            info: ServerInfo::default(),
        }
    }

    pub fn roles(&self) -> Option<&[String]> {
        self.roles.as_deref()
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": self.info,
            "capabilities": {
                "tools": { "listChanged": false },
            },
        })
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, McpServiceError> {
        let params: CallToolParams = match params {
            None | Some(Value::Null) => CallToolParams::default(),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(McpServiceError::InvalidParams)?
            }
        };

        let result = self
            .tools
            .call_for(self.roles(), &params.name, params.arguments)
            .await;

        Ok(serde_json::to_value(result)?)
    }

    /// Handles a single JSON-RPC request
    ///
    /// # Returns
    ///
    /// * `Ok(Some(response))` - result or `-32601` envelope, id echoed
    /// * `Ok(None)` - the request was a notification
    /// * `Err(McpServiceError)` - unexpected failure; the caller reports `-32603`
    pub async fn handle_request(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<Option<JsonRpcResponse>, McpServiceError> {
        let id = request.response_id();

        let response = match request.mcp_method() {
            McpMethod::Initialize => JsonRpcResponse::success(id, self.initialize_result()),
            McpMethod::Initialized => return Ok(None),
            McpMethod::ToolsList => {
                let tools = self.tools.list_for(self.roles());
                JsonRpcResponse::success(id, json!({ "tools": tools }))
            }
            McpMethod::ToolsCall => {
                let result = self.call_tool(request.params.as_ref()).await?;
                JsonRpcResponse::success(id, result)
            }
            McpMethod::Ping => JsonRpcResponse::success(id, json!({})),
            McpMethod::Unknown(method) => {
                tracing::debug!(method = %method, "Unsupported MCP method");
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
            }
        };

        if request.is_notification() {
            return Ok(None);
        }

        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::registry::{ToolDefinition, ToolOutput};
    use crate::mcp::protocol::INVALID_REQUEST;

    fn request(value: Value) -> JsonRpcRequest {
        serde_json::from_value(value).unwrap()
    }

    fn service_with_echo(roles: Option<Vec<String>>) -> GatewayService {
        let tools = Arc::new(ToolRegistry::new());
        tools.register_fn(
            ToolDefinition::new("demo_echo", "Echo arguments", json!({"type": "object"})),
            |arguments| async move { Ok(ToolOutput::Text(Value::Object(arguments).to_string())) },
        );
        tools.register_fn(
            ToolDefinition::new("admin_secret", "Admin only", json!({"type": "object"}))
                .with_required_role(Some("gl-admin".to_string())),
            |_| async { Ok("secret".into()) },
        );
        GatewayService::new(tools, roles)
    }

    #[tokio::test]
    async fn initialize_announces_protocol_and_capabilities() {
        let service = service_with_echo(None);
        let response = service
            .handle_request(&request(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})))
            .await
            .unwrap()
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVICE_NAME);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(response.id, json!(1));
    }

    #[tokio::test]
    async fn initialized_produces_no_body() {
        let service = service_with_echo(None);
        let response = service
            .handle_request(&request(json!({"jsonrpc": "2.0", "method": "initialized"})))
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn requests_without_id_are_notifications() {
        let service = service_with_echo(None);
        let response = service
            .handle_request(&request(json!({"jsonrpc": "2.0", "method": "ping"})))
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn unknown_methods_are_method_not_found() {
        let service = service_with_echo(None);
        let response = service
            .handle_request(&request(json!({"jsonrpc": "2.0", "id": "x", "method": "resources/list"})))
            .await
            .unwrap()
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_ne!(error.code, INVALID_REQUEST);
        assert_eq!(error.message, "Method not found: resources/list");
        assert_eq!(response.id, json!("x"));
    }

    #[tokio::test]
    async fn tools_call_passes_arguments_through() {
        let service = service_with_echo(None);
        let response = service
            .handle_request(&request(json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": {"name": "demo_echo", "arguments": {"q": "hello"}}
            })))
            .await
            .unwrap()
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], r#"{"q":"hello"}"#);
    }

    #[tokio::test]
    async fn non_object_arguments_are_a_dispatch_error() {
        let service = service_with_echo(None);
        let result = service
            .handle_request(&request(json!({
                "jsonrpc": "2.0",
                "id": 6,
                "method": "tools/call",
                "params": {"name": "demo_echo", "arguments": [1, 2]}
            })))
            .await;

        assert!(matches!(result, Err(McpServiceError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn restricted_sessions_only_see_permitted_tools() {
        let service = service_with_echo(Some(vec!["gl-viewer".to_string()]));
        let response = service
            .handle_request(&request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap()
            .unwrap();

        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "demo_echo");

        let call = service
            .handle_request(&request(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "admin_secret", "arguments": {}}
            })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            call.result.unwrap()["content"][0]["text"],
            "Unknown tool: admin_secret"
        );
    }
}
