// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration for the harness.
//!
//! Settings are merged from several sources:
//! - Global config: `~/.mcpdemo/config.json` (or `.yaml`)
//! - Workspace config: `.mcpdemo.json` (or `.yaml`/`.yml`)
//! - Environment: `OPENAI_API_KEY`, `API_KEY`, `OPENAI_BASE_URL`, `MCPDEMO_MODEL`, `MCP_CONFIG_PATH`
//! - CLI options
//!
//! MCP servers live in their own file, see [`crate::mcp::McpConfig`].

mod loader;
mod merger;
mod types;

pub use loader::{
    get_global_config_dir, load_config_file, load_global_config, load_workspace_config,
    CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILES,
};

pub use merger::{merge_config, CliOptions, EnvOverrides};

pub use types::{
    ResolvedConfig, ToolMode, WorkspaceConfig, DEFAULT_HISTORY_WINDOW, DEFAULT_MCP_CONFIG,
    DEFAULT_MODEL, DEFAULT_WEB_BIND,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
pub fn load_config(workspace_root: &Path, cli_options: CliOptions) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = load_workspace_config(workspace_root)?;

    Ok(merge_config(global, workspace, EnvOverrides::from_env(), cli_options))
}
