//! JIRA provider
//!
//! Exposes issue search, lookup, creation, commenting and workflow
//! transitions as `jira_*` tools. Only sessions holding `gl-admin` see them.

use super::{Provider, ToolRegistrar};
use crate::config::Settings;
use crate::mcp::registry::ToolOutput;
use crate::services::adf;
use crate::services::{JiraClient, JiraCredentials};
use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const PROVIDER_NAME: &str = "jira";
pub const REQUIRED_ROLE: &str = "gl-admin";

const DEFAULT_MAX_RESULTS: u32 = 20;

pub struct JiraProvider {
    client: Option<Arc<JiraClient>>,
}

impl JiraProvider {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_credentials(JiraCredentials::from_settings(settings))
    }

    pub fn with_credentials(credentials: Option<JiraCredentials>) -> Self {
        Self {
            client: credentials.map(|c| Arc::new(JiraClient::new(c))),
        }
    }

    fn register_tool<A, F, Fut>(
        &self,
        registrar: &mut ToolRegistrar<'_>,
        client: &Arc<JiraClient>,
        name: &'static str,
        description: &str,
        input_schema: Value,
        run: F,
    ) where
        A: DeserializeOwned + Send + 'static,
        F: Fn(Arc<JiraClient>, A) -> Fut + Send + Sync + Copy + 'static,
        Fut: std::future::Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let client = Arc::clone(client);
        registrar.register(name, description, input_schema, move |arguments| {
            let client = Arc::clone(&client);
            async move {
                let args: A = parse_arguments(name, arguments)?;
                run(client, args).await.map(ToolOutput::Text)
            }
        });
    }
}

#[async_trait]
impl Provider for JiraProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn required_role(&self) -> Option<&str> {
        Some(REQUIRED_ROLE)
    }

    async fn load_credentials(&self) -> bool {
        let Some(client) = &self.client else {
            tracing::warn!("JIRA credentials not configured");
            return false;
        };

        match client.myself().await {
            Ok(user) => {
                let display_name = user
                    .get("displayName")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                tracing::info!(user = %display_name, url = %client.base_url(), "JIRA connected");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %client.base_url(), "JIRA authentication failed");
                false
            }
        }
    }

    fn register_tools(&self, registrar: &mut ToolRegistrar<'_>) {
        let Some(client) = &self.client else {
            return;
        };

        self.register_tool(
            registrar,
            client,
            "search_issues",
            "Search JIRA issues using JQL query",
            json!({
                "type": "object",
                "properties": {
                    "jql": {
                        "type": "string",
                        "description": "JQL query string (e.g., 'project = GL AND status = \"To Do\"')"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 20)",
                        "default": DEFAULT_MAX_RESULTS
                    }
                },
                "required": ["jql"]
            }),
            search_issues,
        );

        self.register_tool(
            registrar,
            client,
            "get_issue",
            "Get details of a specific JIRA issue",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "Issue key (e.g., 'GL-123')" }
                },
                "required": ["issue_key"]
            }),
            get_issue,
        );

        self.register_tool(
            registrar,
            client,
            "create_issue",
            "Create a new JIRA issue",
            json!({
                "type": "object",
                "properties": {
                    "project": { "type": "string", "description": "Project key (e.g., 'GL')" },
                    "summary": { "type": "string", "description": "Issue summary/title" },
                    "description": { "type": "string", "description": "Issue description (plain text)" },
                    "issue_type": {
                        "type": "string",
                        "description": "Issue type (e.g., 'Task', 'Bug')",
                        "default": "Task"
                    }
                },
                "required": ["project", "summary"]
            }),
            create_issue,
        );

        self.register_tool(
            registrar,
            client,
            "add_comment",
            "Add a comment to a JIRA issue",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "Issue key (e.g., 'GL-123')" },
                    "comment": { "type": "string", "description": "Comment text" }
                },
                "required": ["issue_key", "comment"]
            }),
            add_comment,
        );

        self.register_tool(
            registrar,
            client,
            "transition_issue",
            "Transition a JIRA issue to a new status",
            json!({
                "type": "object",
                "properties": {
                    "issue_key": { "type": "string", "description": "Issue key (e.g., 'GL-123')" },
                    "transition_name": {
                        "type": "string",
                        "description": "Transition name (e.g., 'Done', 'In Progress')"
                    }
                },
                "required": ["issue_key", "transition_name"]
            }),
            transition_issue,
        );
    }
}

#[derive(Debug, Deserialize)]
struct SearchIssuesArgs {
    jql: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Deserialize)]
struct IssueKeyArgs {
    issue_key: String,
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    project: String,
    summary: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_issue_type")]
    issue_type: String,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

impl CreateIssueArgs {
    fn fields(&self) -> Value {
        json!({
            "project": { "key": self.project },
            "summary": self.summary,
            "description": adf::paragraph(&self.description),
            "issuetype": { "name": self.issue_type },
        })
    }
}

#[derive(Debug, Deserialize)]
struct AddCommentArgs {
    issue_key: String,
    comment: String,
}

#[derive(Debug, Deserialize)]
struct TransitionArgs {
    issue_key: String,
    transition_name: String,
}

async fn search_issues(client: Arc<JiraClient>, args: SearchIssuesArgs) -> anyhow::Result<String> {
    let result = client.search_issues(&args.jql, args.max_results).await?;
    Ok(format_search_results(&result))
}

async fn get_issue(client: Arc<JiraClient>, args: IssueKeyArgs) -> anyhow::Result<String> {
    let issue = client.get_issue(&args.issue_key).await?;
    Ok(format_issue(&args.issue_key, &issue))
}

async fn create_issue(client: Arc<JiraClient>, args: CreateIssueArgs) -> anyhow::Result<String> {
    let created = client.create_issue(args.fields()).await?;
    let key = created.get("key").and_then(Value::as_str).unwrap_or("Unknown");
    Ok(format!("Created issue: {}", key))
}

async fn add_comment(client: Arc<JiraClient>, args: AddCommentArgs) -> anyhow::Result<String> {
    client
        .add_comment(&args.issue_key, adf::paragraph(&args.comment))
        .await?;
    Ok(format!("Added comment to {}", args.issue_key))
}

async fn transition_issue(client: Arc<JiraClient>, args: TransitionArgs) -> anyhow::Result<String> {
    let available = client.transitions(&args.issue_key).await?;
    let transitions = available
        .get("transitions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(id) = find_transition(transitions, &args.transition_name) else {
        return Ok(format!(
            "Transition '{}' not found. Available: {}",
            args.transition_name,
            transition_names(transitions).join(", ")
        ));
    };

    client.transition(&args.issue_key, &id).await?;
    Ok(format!(
        "Transitioned {} to '{}'",
        args.issue_key, args.transition_name
    ))
}

fn parse_arguments<A: DeserializeOwned>(tool: &str, arguments: Map<String, Value>) -> anyhow::Result<A> {
    serde_json::from_value(Value::Object(arguments))
        .with_context(|| format!("invalid arguments for {}_{}", PROVIDER_NAME, tool))
}

fn field_name<'a>(fields: &'a Value, field: &str, default: &'a str) -> &'a str {
    fields
        .get(field)
        .and_then(|value| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(default)
}

fn format_search_results(result: &Value) -> String {
    let issues = result
        .get("issues")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if issues.is_empty() {
        return "No issues found matching the query.".to_string();
    }

    let mut lines = vec![format!("Found {} issues:\n", issues.len())];
    for issue in issues {
        let key = issue.get("key").and_then(Value::as_str).unwrap_or("Unknown");
        let fields = issue.get("fields").unwrap_or(&Value::Null);
        let summary = fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("No summary");
        let status = field_name(fields, "status", "Unknown");
        lines.push(format!("- {}: {} [{}]", key, summary, status));
    }

    lines.join("\n")
}

fn format_issue(issue_key: &str, issue: &Value) -> String {
    let fields = issue.get("fields").unwrap_or(&Value::Null);
    let summary = fields
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or("No summary");

    let description = fields
        .get("description")
        .filter(|value| value.is_object())
        .and_then(adf::extract_text)
        .unwrap_or_else(|| "No description".to_string());

    format!(
        "**{key}: {summary}**\n\n\
         **Type:** {kind}\n\
         **Status:** {status}\n\
         **Priority:** {priority}\n\n\
         **Description:**\n\
         {description}\n",
        key = issue_key,
        summary = summary,
        kind = field_name(fields, "issuetype", "Unknown"),
        status = field_name(fields, "status", "Unknown"),
        priority = field_name(fields, "priority", "None"),
        description = description,
    )
}

/// Id of the first transition whose name matches, ignoring case
fn find_transition(transitions: &[Value], name: &str) -> Option<String> {
    let wanted = name.to_lowercase();
    transitions
        .iter()
        .find(|t| {
            t.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.to_lowercase() == wanted)
        })
        .and_then(|t| match t.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        })
}

fn transition_names(transitions: &[Value]) -> Vec<&str> {
    transitions
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .collect()
}
