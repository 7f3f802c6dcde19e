// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bridges from MCP tools to the agent's tool registry.
//!
//! Two shapes are supported:
//! - [`CallToolDispatcher`]: one `call_tool` function that routes by server
//!   and tool name, described to the model in the system prompt.
//! - [`McpToolWrapper`]: one native function per MCP tool, named
//!   `mcp__{server}__{tool}`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::client::ConnectionManager;
use super::error::McpError;
use super::types::{McpToolInfo, McpToolResult};
use crate::config::ToolMode;
use crate::error::ToolError;
use crate::tools::registry::{ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};
use crate::tools::{parse_arguments, truncate_text, MAX_TOOL_OUTPUT_BYTES};
use crate::types::{InputSchema, ToolDefinition};

/// Name of the dispatcher tool.
pub const CALL_TOOL_NAME: &str = "call_tool";

fn to_output(result: Result<McpToolResult, McpError>) -> ToolOutput {
    match result {
        Ok(result) => {
            let text = truncate_text(&result.as_text(), MAX_TOOL_OUTPUT_BYTES);
            if result.is_error {
                ToolOutput::error(text)
            } else {
                ToolOutput::success(text)
            }
        }
        Err(e) => ToolOutput::error(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct CallToolArgs {
    server_name: String,
    tool_name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// The `call_tool` dispatcher.
pub struct CallToolDispatcher {
    manager: Arc<ConnectionManager>,
}

impl CallToolDispatcher {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ToolHandler for CallToolDispatcher {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            CALL_TOOL_NAME,
            "Call a tool on one of the connected MCP servers. The available servers, \
             tools and their input schemas are listed in the system prompt.",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "server_name",
                    serde_json::json!({
                        "type": "string",
                        "description": "Name of the MCP server that owns the tool"
                    }),
                )
                .with_property(
                    "tool_name",
                    serde_json::json!({
                        "type": "string",
                        "description": "Name of the tool to call"
                    }),
                )
                .with_property(
                    "arguments",
                    serde_json::json!({
                        "type": "object",
                        "description": "Arguments matching the tool's input schema"
                    }),
                )
                .with_required(vec!["server_name".to_string(), "tool_name".to_string()]),
        )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: CallToolArgs = parse_arguments(&input)?;

        // Some models send the nested arguments as an encoded JSON string.
        let arguments = match args.arguments {
            serde_json::Value::String(s) if !s.trim().is_empty() => serde_json::from_str(&s)
                .map_err(|e| ToolError::InvalidInput(format!("arguments is not valid JSON: {e}")))?,
            serde_json::Value::Null | serde_json::Value::String(_) => serde_json::json!({}),
            other => other,
        };

        tracing::debug!(server = %args.server_name, tool = %args.tool_name, "dispatching MCP call");
        Ok(to_output(
            self.manager
                .call_tool(&args.server_name, &args.tool_name, arguments)
                .await,
        ))
    }
}

/// Exposes one MCP tool as a native tool.
pub struct McpToolWrapper {
    tool_info: McpToolInfo,
    manager: Arc<ConnectionManager>,
}

impl McpToolWrapper {
    pub fn new(tool_info: McpToolInfo, manager: Arc<ConnectionManager>) -> Self {
        Self { tool_info, manager }
    }

    pub fn info(&self) -> &McpToolInfo {
        &self.tool_info
    }

    pub fn qualified_name(&self) -> String {
        self.tool_info.qualified_name()
    }
}

#[async_trait]
impl ToolHandler for McpToolWrapper {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.qualified_name(),
            description: self
                .tool_info
                .description
                .clone()
                .unwrap_or_else(|| format!("MCP tool from {} server", self.tool_info.server)),
            input_schema: json_schema_to_input_schema(&self.tool_info.input_schema),
        }
    }

    fn is_mutating(&self) -> bool {
        !self.tool_info.read_only
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(to_output(
            self.manager
                .call_tool(&self.tool_info.server, &self.tool_info.name, input)
                .await,
        ))
    }
}

/// Convert an MCP JSON Schema to an [`InputSchema`].
pub fn json_schema_to_input_schema(schema: &serde_json::Value) -> InputSchema {
    let mut input_schema = InputSchema::new();

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in props {
            input_schema.properties.insert(key.clone(), value.clone());
        }
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        let required: Vec<String> = required
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
        if !required.is_empty() {
            input_schema.required = Some(required);
        }
    }

    input_schema.defs = schema
        .get("$defs")
        .or_else(|| schema.get("definitions"))
        .cloned();

    input_schema
}

/// Build the tool registry for a tool mode from the connected servers.
pub async fn build_registry(manager: Arc<ConnectionManager>, mode: ToolMode) -> ToolRegistry {
    let mut builder = ToolRegistryBuilder::new();
    match mode {
        ToolMode::Dispatcher => {
            builder.register(CallToolDispatcher::new(manager));
        }
        ToolMode::Native => {
            for tools in manager.list_all_tools().await.into_values() {
                for info in tools {
                    builder.register(McpToolWrapper::new(info, manager.clone()));
                }
            }
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> McpToolInfo {
        McpToolInfo {
            name: "list_repo_tree".to_string(),
            description: Some("List the tree structure of a GitHub repository".to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "branch": {"$ref": "#/$defs/Branch"}
                },
                "required": ["owner"],
                "$defs": {"Branch": {"type": "string"}}
            }),
            server: "github".to_string(),
            destructive: false,
            read_only: true,
            idempotent: true,
        }
    }

    #[test]
    fn test_wrapper_definition() {
        let wrapper = McpToolWrapper::new(info(), Arc::new(ConnectionManager::new()));
        let def = wrapper.definition();
        assert_eq!(def.name, "mcp__github__list_repo_tree");
        assert_eq!(def.input_schema.required, Some(vec!["owner".to_string()]));
        assert!(def.input_schema.properties.contains_key("branch"));
        assert!(def.input_schema.defs.is_some());
        assert!(!wrapper.is_mutating());
    }

    #[test]
    fn test_dispatcher_definition() {
        let dispatcher = CallToolDispatcher::new(Arc::new(ConnectionManager::new()));
        let def = dispatcher.definition();
        assert_eq!(def.name, "call_tool");
        assert_eq!(def.input_schema.properties.len(), 3);
        assert_eq!(
            def.input_schema.required,
            Some(vec!["server_name".to_string(), "tool_name".to_string()])
        );
    }

    #[tokio::test]
    async fn test_dispatcher_unknown_server_is_error_output() {
        let dispatcher = CallToolDispatcher::new(Arc::new(ConnectionManager::new()));
        let output = dispatcher
            .execute(serde_json::json!({
                "server_name": "github",
                "tool_name": "get_file_contents",
                "arguments": {"owner": "a"}
            }))
            .await
            .unwrap();
        assert!(!output.is_success());
        assert!(output.content().contains("github"));
    }

    #[tokio::test]
    async fn test_dispatcher_rejects_bad_input() {
        let dispatcher = CallToolDispatcher::new(Arc::new(ConnectionManager::new()));
        let err = dispatcher
            .execute(serde_json::json!({"tool_name": "x"}))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = dispatcher
            .execute(serde_json::json!({
                "server_name": "s", "tool_name": "t", "arguments": "{not json"
            }))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_wrapper_without_connection_is_error_output() {
        let wrapper = McpToolWrapper::new(info(), Arc::new(ConnectionManager::new()));
        let output = wrapper.execute(serde_json::json!({"owner": "a"})).await.unwrap();
        assert!(!output.is_success());
    }

    #[test]
    fn test_to_output() {
        assert!(to_output(Ok(McpToolResult::text("ok"))).is_success());
        assert!(!to_output(Ok(McpToolResult::error("bad"))).is_success());
        let out = to_output(Err(McpError::ServerNotFound("x".to_string())));
        assert_eq!(out.content(), "MCP server not found: x");
    }

    #[tokio::test]
    async fn test_build_registry_modes() {
        let manager = Arc::new(ConnectionManager::new());
        let registry = build_registry(manager.clone(), ToolMode::Dispatcher).await;
        assert_eq!(registry.tool_names(), vec!["call_tool"]);

        let registry = build_registry(manager, ToolMode::Native).await;
        assert!(registry.is_empty());
    }
}
