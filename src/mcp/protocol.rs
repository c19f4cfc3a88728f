//! JSON-RPC 2.0 envelope types for the MCP HTTP transport
//!
//! Inbound bodies are parsed into a [`JsonRpcRequest`] before any session
//! logic runs. Method names are resolved into the closed [`McpMethod`]
//! enumeration so the dispatcher can match exhaustively.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Protocol version announced in the `initialize` result
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Header carrying the session identifier in both directions
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Media type a client must accept to open the streaming channel
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;

/// An inbound JSON-RPC message
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// `None` only when the member is absent; an explicit `null` is kept
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Parses a raw request body
    ///
    /// Anything that is not a JSON object with a string `method` is rejected.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn mcp_method(&self) -> McpMethod {
        McpMethod::from(self.method.as_str())
    }

    /// Notifications carry no id or name a one-way method; they never get a body back
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.mcp_method().is_one_way()
    }

    /// The id to echo in a response, `null` when the request had none
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Methods understood by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Initialized,
    ToolsList,
    ToolsCall,
    Ping,
    Unknown(String),
}

impl McpMethod {
    pub fn is_one_way(&self) -> bool {
        matches!(self, McpMethod::Initialized)
    }
}

impl From<&str> for McpMethod {
    fn from(method: &str) -> Self {
        match method {
            "initialize" => McpMethod::Initialize,
            "initialized" | "notifications/initialized" => McpMethod::Initialized,
            "tools/list" => McpMethod::ToolsList,
            "tools/call" => McpMethod::ToolsCall,
            "ping" => McpMethod::Ping,
            other => McpMethod::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// An outbound JSON-RPC message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn parse_error() -> Self {
        Self::error(Value::Null, PARSE_ERROR, "Parse error")
    }

    pub fn invalid_session(id: Value) -> Self {
        Self::error(id, INVALID_REQUEST, "Invalid session")
    }
}

/// Parameters of a `tools/call` request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallToolParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_full_request() {
        let body = br#"{"jsonrpc":"2.0","id":7,"method":"tools/list","params":{}}"#;
        let request = JsonRpcRequest::parse(body).unwrap();
        assert_eq!(request.mcp_method(), McpMethod::ToolsList);
        assert_eq!(request.response_id(), json!(7));
        assert!(!request.is_notification());
    }

    #[test]
    fn null_id_is_a_request_not_a_notification() {
        let request =
            JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#)
                .unwrap();
        assert_eq!(request.id, Some(Value::Null));
        assert_eq!(request.response_id(), Value::Null);
        assert!(!request.is_notification());

        let request = JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","method":"tools/list"}"#).unwrap();
        assert_eq!(request.id, None);
        assert!(request.is_notification());
    }

    #[test]
    fn rejects_bodies_without_a_method() {
        assert!(JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","id":1}"#).is_err());
        assert!(JsonRpcRequest::parse(b"[1,2,3]").is_err());
        assert!(JsonRpcRequest::parse(b"not json").is_err());
    }

    #[test]
    fn initialized_is_a_notification_even_with_an_id() {
        let request =
            JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","id":3,"method":"initialized"}"#).unwrap();
        assert!(request.is_notification());

        let modern =
            JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert_eq!(modern.mcp_method(), McpMethod::Initialized);
    }

    #[test]
    fn unknown_methods_keep_their_name() {
        assert_eq!(
            McpMethod::from("resources/list"),
            McpMethod::Unknown("resources/list".to_string())
        );
    }

    #[test]
    fn error_envelope_omits_result() {
        let value = serde_json::to_value(JsonRpcResponse::invalid_session(json!(4))).unwrap();
        assert_eq!(value["error"]["code"], INVALID_REQUEST);
        assert_eq!(value["id"], 4);
        assert!(value.get("result").is_none());
    }
}
