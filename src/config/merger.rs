// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Precedence, highest first: CLI flags, environment, workspace file,
//! global file, built-in defaults.

use super::types::{ResolvedConfig, ToolMode, WorkspaceConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub mcp_config: Option<String>,
    pub tool_mode: Option<ToolMode>,
    pub history_window: Option<usize>,
    pub web_bind: Option<String>,
}

/// Values read from the process environment (after `.env` is loaded).
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub mcp_config: Option<String>,
}

impl EnvOverrides {
    /// Read `OPENAI_API_KEY`/`API_KEY`, `OPENAI_BASE_URL`, `MCPDEMO_MODEL`
    /// and `MCP_CONFIG_PATH`.
    pub fn from_env() -> Self {
        let non_empty = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: crate::providers::api_key_from_env(),
            base_url: non_empty("OPENAI_BASE_URL"),
            model: non_empty("MCPDEMO_MODEL"),
            mcp_config: non_empty("MCP_CONFIG_PATH"),
        }
    }
}

/// Merge all sources into a resolved configuration.
pub fn merge_config(
    global: Option<WorkspaceConfig>,
    workspace: Option<WorkspaceConfig>,
    env: EnvOverrides,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    for config in [global, workspace].into_iter().flatten() {
        apply_workspace_config(&mut result, config);
    }

    apply_env(&mut result, env);
    apply_cli_options(&mut result, cli);

    result
}

fn apply_workspace_config(result: &mut ResolvedConfig, config: WorkspaceConfig) {
    if let Some(model) = config.model {
        result.model = model;
    }
    if config.base_url.is_some() {
        result.base_url = config.base_url;
    }
    if let Some(t) = config.temperature {
        result.temperature = t;
    }
    if let Some(n) = config.max_tokens {
        result.max_tokens = n;
    }
    if let Some(n) = config.history_window {
        result.history_window = n;
    }
    if let Some(mode) = config.tool_mode {
        result.tool_mode = mode;
    }
    if let Some(n) = config.max_iterations {
        result.max_iterations = n;
    }
    if let Some(path) = config.mcp_config {
        result.mcp_config = path;
    }
    if let Some(bind) = config.web_bind {
        result.web_bind = bind;
    }
    if config.system_prompt_additions.is_some() {
        result.system_prompt_additions = config.system_prompt_additions;
    }
}

fn apply_env(result: &mut ResolvedConfig, env: EnvOverrides) {
    if env.api_key.is_some() {
        result.api_key = env.api_key;
    }
    if env.base_url.is_some() {
        result.base_url = env.base_url;
    }
    if let Some(model) = env.model {
        result.model = model;
    }
    if let Some(path) = env.mcp_config {
        result.mcp_config = path;
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: CliOptions) {
    if let Some(model) = cli.model {
        result.model = model;
    }
    if cli.base_url.is_some() {
        result.base_url = cli.base_url;
    }
    if let Some(path) = cli.mcp_config {
        result.mcp_config = path;
    }
    if let Some(mode) = cli.tool_mode {
        result.tool_mode = mode;
    }
    if let Some(n) = cli.history_window {
        result.history_window = n;
    }
    if let Some(bind) = cli.web_bind {
        result.web_bind = bind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_defaults() {
        let config = merge_config(None, None, EnvOverrides::default(), CliOptions::default());
        assert_eq!(config.model, "gpt-4o");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_merge_config_precedence() {
        let global = WorkspaceConfig {
            model: Some("global-model".to_string()),
            history_window: Some(5),
            max_tokens: Some(1000),
            ..Default::default()
        };
        let workspace = WorkspaceConfig {
            model: Some("workspace-model".to_string()),
            history_window: Some(7),
            ..Default::default()
        };
        let env = EnvOverrides {
            model: Some("env-model".to_string()),
            api_key: Some("sk-env".to_string()),
            ..Default::default()
        };

        let config = merge_config(Some(global), Some(workspace), env, CliOptions::default());
        assert_eq!(config.model, "env-model");
        assert_eq!(config.history_window, 7);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn test_cli_options_override() {
        let workspace = WorkspaceConfig {
            tool_mode: Some(ToolMode::Native),
            mcp_config: Some("servers.json".to_string()),
            ..Default::default()
        };
        let env = EnvOverrides {
            mcp_config: Some("env.json".to_string()),
            ..Default::default()
        };
        let cli = CliOptions {
            tool_mode: Some(ToolMode::Dispatcher),
            model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };

        let config = merge_config(None, Some(workspace), env, cli);
        assert_eq!(config.tool_mode, ToolMode::Dispatcher);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.mcp_config, "env.json");
    }
}
