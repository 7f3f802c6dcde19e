// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP client error types.

use thiserror::Error;

/// Errors that can occur while talking to MCP servers.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP server not found: {0}")]
    ServerNotFound(String),

    #[error("Tool not found: {server}::{tool}")]
    ToolNotFound { server: String, tool: String },

    #[error("Failed to connect to MCP server '{server}': {message}")]
    ConnectionFailed { server: String, message: String },

    #[error("Connection to MCP server '{server}' timed out after {timeout_secs}s")]
    ConnectionTimeout { server: String, timeout_secs: u64 },

    #[error("Tool call '{tool}' failed: {message}")]
    ToolCallFailed { tool: String, message: String },

    #[error("Tool call '{tool}' timed out after {timeout_secs}s")]
    ToolCallTimeout { tool: String, timeout_secs: u64 },

    #[error("Invalid response from MCP server: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP server '{0}' is already connected")]
    AlreadyConnected(String),

    /// Still connecting, failed, or disconnected.
    #[error("MCP server '{0}' is not ready")]
    NotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the rmcp service layer.
    #[error("RMCP error: {0}")]
    Rmcp(String),
}

impl McpError {
    pub fn connection_failed(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            server: server.into(),
            message: message.into(),
        }
    }

    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolCallFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn tool_not_found(server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self::ToolNotFound {
            server: server.into(),
            tool: tool.into(),
        }
    }
}

impl From<rmcp::ServiceError> for McpError {
    fn from(err: rmcp::ServiceError) -> Self {
        Self::Rmcp(err.to_string())
    }
}
