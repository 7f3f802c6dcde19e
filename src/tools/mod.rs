// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tools the model can call.
//!
//! The only tools in this harness are bridges to MCP servers (see
//! [`crate::mcp::tools`]). This module holds the generic plumbing.

pub mod registry;

pub use registry::{DispatchResult, ToolHandler, ToolOutput, ToolRegistry, ToolRegistryBuilder};

use crate::error::ToolError;
use serde::Deserialize;

/// Default cap on tool output handed back to the model, in bytes.
pub const MAX_TOOL_OUTPUT_BYTES: usize = 100 * 1024;

/// Parse JSON arguments into a typed struct.
pub fn parse_arguments<T>(arguments: &serde_json::Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}

/// Truncate text to a maximum byte length, respecting UTF-8 boundaries.
pub fn truncate_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}... [truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_short() {
        assert_eq!(truncate_text("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_text_long() {
        let truncated = truncate_text("Hello, world!", 5);
        assert_eq!(truncated, "Hello... [truncated]");
    }

    #[test]
    fn test_truncate_text_utf8() {
        let text = "こんにちは"; // 15 bytes
        assert!(truncate_text(text, 7).starts_with("こん..."));
    }

    #[test]
    fn test_parse_arguments() {
        #[derive(Deserialize)]
        struct Args {
            owner: String,
            #[serde(default)]
            branch: Option<String>,
        }

        let args: Args = parse_arguments(&serde_json::json!({"owner": "octocat"})).unwrap();
        assert_eq!(args.owner, "octocat");
        assert!(args.branch.is_none());

        let err = parse_arguments::<Args>(&serde_json::json!({"branch": 1})).err().unwrap();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
