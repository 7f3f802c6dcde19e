// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from JSON and YAML files.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::WorkspaceConfig;

/// Workspace config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[".mcpdemo.json", ".mcpdemo.yaml", ".mcpdemo.yml"];

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".mcpdemo";

/// Global config file names, searched in order inside [`GLOBAL_CONFIG_DIR`].
pub const GLOBAL_CONFIG_FILES: &[&str] = &["config.json", "config.yaml", "config.yml"];

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Load global configuration from `~/.mcpdemo/`.
pub fn load_global_config() -> Result<Option<WorkspaceConfig>, ConfigError> {
    match get_global_config_dir() {
        Some(dir) => load_first(&dir, GLOBAL_CONFIG_FILES),
        None => Ok(None),
    }
}

/// Load workspace configuration from the workspace root.
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    load_first(workspace_root, CONFIG_FILES)
}

fn load_first(dir: &Path, names: &[&str]) -> Result<Option<WorkspaceConfig>, ConfigError> {
    for filename in names {
        let path = dir.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML, chosen by extension).
pub fn load_config_file(path: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}
