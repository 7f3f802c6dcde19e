// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP types for tool, resource and content handling.
//!
//! These wrap the rmcp SDK types so the rest of the crate does not depend
//! on the protocol model directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use rmcp::model::{RawContent, ResourceContents};

/// Prefix of tool names exposed natively to the model.
pub const QUALIFIED_PREFIX: &str = "mcp__";

/// Information about an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolInfo {
    pub name: String,

    pub description: Option<String>,

    /// JSON Schema for tool input.
    pub input_schema: serde_json::Value,

    /// Server this tool belongs to.
    pub server: String,

    #[serde(default)]
    pub destructive: bool,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub idempotent: bool,
}

impl McpToolInfo {
    /// Build from an rmcp tool definition.
    pub fn from_rmcp(server: &str, tool: &rmcp::model::Tool) -> Self {
        let input_schema = serde_json::Value::Object(tool.input_schema.as_ref().clone());
        let annotations = tool.annotations.as_ref();
        Self {
            name: tool.name.to_string(),
            description: tool.description.as_ref().map(|d| d.to_string()),
            input_schema,
            server: server.to_string(),
            destructive: annotations.and_then(|a| a.destructive_hint).unwrap_or(false),
            read_only: annotations.and_then(|a| a.read_only_hint).unwrap_or(false),
            idempotent: annotations.and_then(|a| a.idempotent_hint).unwrap_or(false),
        }
    }

    /// Name used when the tool is exposed natively: `mcp__{server}__{tool}`.
    ///
    /// Characters the model API rejects in function names become `_`.
    pub fn qualified_name(&self) -> String {
        format!(
            "{}{}__{}",
            QUALIFIED_PREFIX,
            sanitize_name(&self.server),
            sanitize_name(&self.name)
        )
    }
}

fn sanitize_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Information about a resource offered by an MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub server: String,
}

impl McpResourceInfo {
    /// Build from an rmcp resource listing entry.
    pub fn from_rmcp(server: &str, resource: &rmcp::model::Resource) -> Self {
        Self {
            uri: resource.uri.clone(),
            name: resource.name.clone(),
            description: resource.description.clone(),
            mime_type: resource.mime_type.clone(),
            server: server.to_string(),
        }
    }
}

/// Tools grouped by server name.
pub type ToolCatalog = BTreeMap<String, Vec<McpToolInfo>>;

/// Resources grouped by server name.
pub type ResourceCatalog = BTreeMap<String, Vec<McpResourceInfo>>;

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    pub content: Vec<McpContent>,

    #[serde(default)]
    pub is_error: bool,
}

impl McpToolResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Convert an rmcp call result.
    pub fn from_rmcp(result: rmcp::model::CallToolResult) -> Self {
        let mut content: Vec<McpContent> = result.content.iter().map(|c| McpContent::from_rmcp(&c.raw)).collect();
        if content.is_empty() {
            if let Some(structured) = result.structured_content {
                content.push(McpContent::Text {
                    text: structured.to_string(),
                });
            }
        }
        Self {
            content,
            is_error: result.is_error.unwrap_or(false),
        }
    }

    /// Text parts joined by newlines. Non-text parts are summarized.
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content types that can be returned by MCP tools and resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum McpContent {
    Text {
        text: String,
    },

    Image {
        /// Base64-encoded image data.
        data: String,
        mime_type: String,
    },

    Resource {
        uri: String,
        mime_type: Option<String>,
        text: Option<String>,
    },
}

impl McpContent {
    pub fn from_rmcp(raw: &RawContent) -> Self {
        match raw {
            RawContent::Text(t) => Self::Text {
                text: t.text.clone(),
            },
            RawContent::Image(img) => Self::Image {
                data: img.data.clone(),
                mime_type: img.mime_type.clone(),
            },
            RawContent::Audio(audio) => Self::Image {
                data: audio.data.clone(),
                mime_type: audio.mime_type.clone(),
            },
            RawContent::Resource(embedded) => Self::from_resource_contents(&embedded.resource),
            RawContent::ResourceLink(link) => Self::Resource {
                uri: link.uri.clone(),
                mime_type: link.mime_type.clone(),
                text: None,
            },
        }
    }

    pub fn from_resource_contents(contents: &ResourceContents) -> Self {
        match contents {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => Self::Resource {
                uri: uri.clone(),
                mime_type: mime_type.clone(),
                text: Some(text.clone()),
            },
            ResourceContents::BlobResourceContents { uri, mime_type, .. } => Self::Resource {
                uri: uri.clone(),
                mime_type: mime_type.clone(),
                text: None,
            },
        }
    }

    /// Render as text for the model.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Image { mime_type, data } => {
                format!("[{} content, {} bytes base64]", mime_type, data.len())
            }
            Self::Resource {
                text: Some(text), ..
            } => text.clone(),
            Self::Resource { uri, mime_type, .. } => format!(
                "[resource {}{}]",
                uri,
                mime_type.as_deref().map(|m| format!(" ({})", m)).unwrap_or_default()
            ),
        }
    }
}

/// Server information reported during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub supports_tools: bool,
    #[serde(default)]
    pub supports_resources: bool,
}

impl ServerInfo {
    pub fn from_rmcp(info: &rmcp::model::ServerInfo) -> Self {
        Self {
            name: info.server_info.name.clone(),
            version: info.server_info.version.clone(),
            protocol_version: Some(info.protocol_version.to_string()),
            instructions: info.instructions.clone(),
            supports_tools: info.capabilities.tools.is_some(),
            supports_resources: info.capabilities.resources.is_some(),
        }
    }
}

/// Connection state for an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Initialized and ready for requests.
    Connected,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
