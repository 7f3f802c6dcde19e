// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default number of conversation items kept when calling the model.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Default servers file, in the Claude Desktop format.
pub const DEFAULT_MCP_CONFIG: &str = "claude_mcp_config.json";

/// Default address for the browser UI.
pub const DEFAULT_WEB_BIND: &str = "127.0.0.1:8501";

/// How MCP tools are presented to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// One `call_tool` function taking server, tool and arguments.
    #[default]
    Dispatcher,
    /// Every MCP tool as its own function.
    Native,
}

impl std::str::FromStr for ToolMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dispatcher" | "call_tool" => Ok(Self::Dispatcher),
            "native" => Ok(Self::Native),
            other => Err(ConfigError::InvalidValue {
                field: "toolMode".to_string(),
                message: format!("expected 'dispatcher' or 'native', got '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for ToolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatcher => write!(f, "dispatcher"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Settings file contents. Found at `~/.mcpdemo/config.json` or
/// `.mcpdemo.json` in the working directory (YAML also accepted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Number of conversation items sent to the model (0 = unlimited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_window: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_mode: Option<ToolMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    /// Path to the MCP servers file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_config: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_bind: Option<String>,

    /// Additional text appended to the generated system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_additions: Option<String>,
}

/// Fully merged configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub model: String,
    pub base_url: Option<String>,
    #[serde(serialize_with = "redact")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub history_window: usize,
    pub tool_mode: ToolMode,
    pub max_iterations: u32,
    pub mcp_config: String,
    pub web_bind: String,
    pub system_prompt_additions: Option<String>,
}

fn redact<S: serde::Serializer>(key: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(_) => s.serialize_str("********"),
        None => s.serialize_none(),
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            max_tokens: 4096,
            history_window: DEFAULT_HISTORY_WINDOW,
            tool_mode: ToolMode::Dispatcher,
            max_iterations: 25,
            mcp_config: DEFAULT_MCP_CONFIG.to_string(),
            web_bind: DEFAULT_WEB_BIND.to_string(),
            system_prompt_additions: None,
        }
    }
}

impl ResolvedConfig {
    /// Provider settings derived from this configuration.
    pub fn provider_config(&self) -> crate::types::ProviderConfig {
        crate::types::ProviderConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolvedConfig::default();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.tool_mode, ToolMode::Dispatcher);
        assert_eq!(config.mcp_config, "claude_mcp_config.json");
    }

    #[test]
    fn test_tool_mode_parse() {
        assert_eq!("native".parse::<ToolMode>().unwrap(), ToolMode::Native);
        assert_eq!("Dispatcher".parse::<ToolMode>().unwrap(), ToolMode::Dispatcher);
        assert!("both".parse::<ToolMode>().is_err());
        assert_eq!(ToolMode::Native.to_string(), "native");
    }

    #[test]
    fn test_workspace_config_camel_case() {
        let config: WorkspaceConfig = serde_json::from_str(
            r#"{"historyWindow": 8, "toolMode": "native", "maxTokens": 1000}"#,
        )
        .unwrap();
        assert_eq!(config.history_window, Some(8));
        assert_eq!(config.tool_mode, Some(ToolMode::Native));
        assert_eq!(config.max_tokens, Some(1000));
    }

    #[test]
    fn test_api_key_redacted() {
        let config = ResolvedConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert!(json.contains("********"));
    }
}
