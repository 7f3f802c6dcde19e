// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP server configuration.
//!
//! Servers are read from `claude_mcp_config.json` by default. Both the
//! Claude Desktop layout and the snake_case layout are accepted:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "github": {
//!       "command": "github-mcp",
//!       "args": [],
//!       "env": { "GITHUB_PERSONAL_ACCESS_TOKEN": "${GITHUB_PERSONAL_ACCESS_TOKEN}" },
//!       "tool_timeout_sec": 60
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::error::McpError;

/// Value prefix that names an environment variable to read the value from.
pub const ENV_VALUE_PREFIX: &str = "ENV_";

/// MCP configuration containing all server definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl McpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, McpError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            McpError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// `mcpServers` wins when both keys are present.
    pub fn from_json(json: &str) -> Result<Self, McpError> {
        #[derive(Deserialize)]
        struct FileConfig {
            #[serde(default, rename = "mcpServers")]
            mcp_servers_camel: Option<BTreeMap<String, ServerConfig>>,
            #[serde(default)]
            mcp_servers: Option<BTreeMap<String, ServerConfig>>,
        }

        let file: FileConfig = serde_json::from_str(json)?;
        let servers = file
            .mcp_servers_camel
            .or(file.mcp_servers)
            .ok_or_else(|| McpError::Config("no `mcpServers` section".to_string()))?;

        Ok(Self { servers })
    }

    /// Servers with `enabled: true`.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &ServerConfig)> {
        self.servers.iter().filter(|(_, c)| c.enabled)
    }

    pub fn add_server(&mut self, name: impl Into<String>, config: ServerConfig) {
        self.servers.insert(name.into(), config);
    }

    pub fn remove_server(&mut self, name: &str) -> Option<ServerConfig> {
        self.servers.remove(name)
    }
}

/// Configuration for a single stdio MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Program to spawn.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the child. Values support `${VAR}` expansion.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Working directory for the child.
    #[serde(default)]
    pub cwd: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_sec: u64,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_sec: u64,

    /// If non-empty, only these tools are exposed.
    #[serde(default)]
    pub enabled_tools: Vec<String>,

    #[serde(default)]
    pub disabled_tools: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_startup_timeout() -> u64 {
    30
}

fn default_tool_timeout() -> u64 {
    300
}

impl ServerConfig {
    /// Create a stdio server configuration.
    pub fn stdio(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            enabled: true,
            startup_timeout_sec: default_startup_timeout(),
            tool_timeout_sec: default_tool_timeout(),
            enabled_tools: Vec::new(),
            disabled_tools: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_env(
        mut self,
        env: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_enabled_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enabled_tools = tools.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_disabled_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.disabled_tools = tools.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Check if a tool passes the enabled/disabled filters.
    pub fn is_tool_enabled(&self, tool_name: &str) -> bool {
        if self.disabled_tools.iter().any(|t| t == tool_name) {
            return false;
        }
        self.enabled_tools.is_empty() || self.enabled_tools.iter().any(|t| t == tool_name)
    }

    /// Arguments after environment expansion.
    pub fn expanded_args(&self) -> Vec<String> {
        self.args.iter().map(|a| expand_env_vars(a)).collect()
    }

    /// Environment after expansion.
    pub fn expanded_env(&self) -> BTreeMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), expand_env_vars(v)))
            .collect()
    }
}

/// Expand environment references in a config value.
///
/// `${VAR}` anywhere in the string is replaced. A whole value of the form
/// `ENV_NAME` is replaced by the value of `NAME`. Unset variables become
/// empty strings.
pub fn expand_env_vars(value: &str) -> String {
    if let Some(var) = value.strip_prefix(ENV_VALUE_PREFIX) {
        if !var.is_empty() && var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return lookup_var(var);
        }
    }

    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup_var(&rest[start + 2..start + end]));
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn lookup_var(name: &str) -> String {
    match std::env::var(name) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(var = name, "environment variable referenced by MCP config is not set");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claude_desktop_layout() {
        let json = r#"
        {
            "mcpServers": {
                "github": {
                    "command": "python",
                    "args": ["src/servers/github_server.py"],
                    "env": {"GITHUB_PERSONAL_ACCESS_TOKEN": "ENV_GITHUB_PERSONAL_ACCESS_TOKEN"}
                }
            }
        }
        "#;

        let config = McpConfig::from_json(json).unwrap();
        assert_eq!(config.servers.len(), 1);

        let gh = &config.servers["github"];
        assert_eq!(gh.command, "python");
        assert_eq!(gh.args, vec!["src/servers/github_server.py"]);
        assert!(gh.enabled);
        assert_eq!(gh.startup_timeout_sec, 30);
        assert_eq!(gh.tool_timeout_sec, 300);
    }

    #[test]
    fn test_parse_snake_case_layout() {
        let json = r#"
        {
            "mcp_servers": {
                "fs": {"command": "npx", "args": ["-y", "server-filesystem"], "enabled": false},
                "gh": {"command": "github-mcp", "tool_timeout_sec": 10}
            }
        }
        "#;

        let config = McpConfig::from_json(json).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert!(!config.servers["fs"].enabled);
        assert_eq!(config.servers["gh"].tool_timeout_sec, 10);

        let enabled: Vec<_> = config.enabled_servers().map(|(n, _)| n.as_str()).collect();
        assert_eq!(enabled, vec!["gh"]);
    }

    #[test]
    fn test_parse_missing_section() {
        assert!(matches!(
            McpConfig::from_json(r#"{"other": {}}"#),
            Err(McpError::Config(_))
        ));
        assert!(matches!(McpConfig::from_json("not json"), Err(McpError::Json(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claude_mcp_config.json");
        std::fs::write(&path, r#"{"mcpServers": {"a": {"command": "a-server"}}}"#).unwrap();

        let config = McpConfig::load_from_file(&path).unwrap();
        assert_eq!(config.servers["a"].command, "a-server");

        let missing = McpConfig::load_from_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(McpError::Config(_))));
    }

    #[test]
    fn test_tool_filtering() {
        let config = ServerConfig::stdio("test").with_enabled_tools(["get_file_contents"]);
        assert!(config.is_tool_enabled("get_file_contents"));
        assert!(!config.is_tool_enabled("list_repo_tree"));

        let config = ServerConfig::stdio("test").with_disabled_tools(["list_repo_tree"]);
        assert!(config.is_tool_enabled("get_file_contents"));
        assert!(!config.is_tool_enabled("list_repo_tree"));

        assert!(ServerConfig::stdio("test").is_tool_enabled("anything"));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("MCPDEMO_TEST_TOKEN", "ghp_abc");
        assert_eq!(expand_env_vars("${MCPDEMO_TEST_TOKEN}"), "ghp_abc");
        assert_eq!(expand_env_vars("token ${MCPDEMO_TEST_TOKEN}!"), "token ghp_abc!");
        assert_eq!(expand_env_vars("ENV_MCPDEMO_TEST_TOKEN"), "ghp_abc");
        assert_eq!(expand_env_vars("${MCPDEMO_TEST_UNSET_VAR}"), "");
        assert_eq!(expand_env_vars("plain"), "plain");
        assert_eq!(expand_env_vars("${unterminated"), "${unterminated");
    }

    #[test]
    fn test_expanded_env_and_args() {
        std::env::set_var("MCPDEMO_TEST_DIR", "/srv/repo");
        let config = ServerConfig::stdio("server")
            .with_args(["--root", "${MCPDEMO_TEST_DIR}"])
            .with_env([("ROOT", "ENV_MCPDEMO_TEST_DIR")])
            .with_cwd("/tmp");

        assert_eq!(config.expanded_args(), vec!["--root", "/srv/repo"]);
        assert_eq!(config.expanded_env()["ROOT"], "/srv/repo");
        assert_eq!(config.cwd.as_deref(), Some("/tmp"));
    }
}
