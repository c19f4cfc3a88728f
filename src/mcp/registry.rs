//! Process-wide tool registry
//!
//! Maps a tool name to its definition and handler. Tools are registered by
//! providers during startup and shared read-only by every session afterwards.
//!
//! Handler failures never become protocol errors: [`ToolRegistry::call`]
//! turns them into an `Error: ...` text item inside a successful result.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

/// Boxed future returned by a tool handler
pub type ToolFuture = Pin<Box<dyn Future<Output = anyhow::Result<ToolOutput>> + Send>>;

/// A callable bound to one tool name
pub type ToolHandler = Arc<dyn Fn(Map<String, Value>) -> ToolFuture + Send + Sync>;

/// What a handler produced: plain text or an already-built content list
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Text(String),
    Content(Vec<Content>),
}

impl ToolOutput {
    pub fn into_content(self) -> Vec<Content> {
        match self {
            ToolOutput::Text(text) => vec![Content::text(text)],
            ToolOutput::Content(content) => content,
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<Vec<Content>> for ToolOutput {
    fn from(content: Vec<Content>) -> Self {
        ToolOutput::Content(content)
    }
}

/// Client-facing description of a tool
///
/// The input schema is opaque and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Role a session needs to see this tool, inherited from its provider
    #[serde(skip)]
    pub required_role: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            required_role: None,
        }
    }

    pub fn with_required_role(mut self, role: Option<String>) -> Self {
        self.required_role = role;
        self
    }

    /// `None` means the caller is unrestricted
    pub fn is_visible_to(&self, roles: Option<&[String]>) -> bool {
        match (&self.required_role, roles) {
            (Some(required), Some(granted)) => granted.iter().any(|role| role == required),
            _ => true,
        }
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

/// Registry of tools in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<Vec<RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool, replacing any earlier tool with the same name in place
    pub fn register(&self, definition: ToolDefinition, handler: ToolHandler) {
        let mut tools = self.tools.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(tool = %definition.name, "Registered tool");

        match tools
            .iter_mut()
            .find(|tool| tool.definition.name == definition.name)
        {
            Some(existing) => {
                existing.definition = definition;
                existing.handler = handler;
            }
            None => tools.push(RegisteredTool {
                definition,
                handler,
            }),
        }
    }

    /// Registers an async closure as a handler
    pub fn register_fn<F, Fut>(&self, definition: ToolDefinition, handler: F)
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |arguments| Box::pin(handler(arguments)));
        self.register(definition, handler);
    }

    /// All tools, in registration order
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.list_for(None)
    }

    /// Tools visible to a session holding `roles`
    pub fn list_for(&self, roles: Option<&[String]>) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|tool| tool.definition.is_visible_to(roles))
            .map(|tool| tool.definition.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|tool| tool.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes a tool without role filtering
    pub async fn call(&self, name: &str, arguments: Map<String, Value>) -> CallToolResult {
        self.call_for(None, name, arguments).await
    }

    /// Invokes a tool on behalf of a session holding `roles`
    ///
    /// Unknown (or hidden) tools and failing handlers both produce a
    /// successful result whose single text item describes the problem.
    pub async fn call_for(
        &self,
        roles: Option<&[String]>,
        name: &str,
        arguments: Map<String, Value>,
    ) -> CallToolResult {
        // The lock is released before the handler is awaited.
        let handler = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|tool| tool.definition.name == name && tool.definition.is_visible_to(roles))
            .map(|tool| Arc::clone(&tool.handler));

        let Some(handler) = handler else {
            tracing::warn!(tool = %name, "Call to unknown tool");
            return CallToolResult::error(vec![Content::text(format!("Unknown tool: {}", name))]);
        };

        match tokio::spawn(handler(arguments)).await {
            Ok(Ok(output)) => CallToolResult::success(output.into_content()),
            Ok(Err(e)) => {
                tracing::error!(tool = %name, error = %format!("{:#}", e), "Error executing tool");
                CallToolResult::error(vec![Content::text(format!("Error: {:#}", e))])
            }
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Tool handler aborted");
                CallToolResult::error(vec![Content::text(format!(
                    "Error: tool handler aborted: {}",
                    e
                ))])
            }
        }
    }
}
