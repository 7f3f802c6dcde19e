// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool arguments and GitHub REST payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Arguments of `get_file_contents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GetFileContentsArgs {
    /// The owner of the GitHub repository.
    pub owner: String,
    /// The repository name.
    pub repo: String,
    /// The path to the file.
    pub path: String,
    /// The branch name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_recursive() -> u32 {
    1
}

/// Arguments of `list_repo_tree`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GetTreeArgs {
    /// The owner of the GitHub repository.
    pub owner: String,
    /// The repository name.
    pub repo: String,
    /// The branch name. Defaults to main.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// The depth of recursion. Defaults to 1.
    #[serde(default = "default_recursive")]
    pub recursive: u32,
}

/// Body of `GET /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubContent {
    #[serde(default)]
    pub url: Option<String>,
    /// Base64, wrapped with newlines by GitHub.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    /// Set on error responses.
    #[serde(default)]
    pub message: Option<String>,
}

/// One entry of a git tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeItem {
    pub path: String,
    pub mode: String,
    /// `blob` or `tree`.
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    pub size: Option<u64>,
    pub url: String,
}

/// Body of `GET /repos/{owner}/{repo}/git/trees/{branch}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubTreeResponse {
    pub sha: String,
    pub url: String,
    pub tree: Vec<TreeItem>,
    pub truncated: bool,
}

/// Error body GitHub sends with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GitHubErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
