// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Example MCP server giving read access to GitHub repositories.
//!
//! Two tools, each mapped to one REST endpoint:
//!
//! | Tool | Endpoint |
//! |------|----------|
//! | `get_file_contents` | `GET /repos/{owner}/{repo}/contents/{path}` |
//! | `list_repo_tree` | `GET /repos/{owner}/{repo}/git/trees/{branch}` |
//!
//! Served on stdio by the `github-mcp` binary.

pub mod client;
pub mod schemas;
pub mod server;

pub use client::{decode_content, GithubClient, API_URL_VAR, DEFAULT_API_URL, TOKEN_VAR};
pub use schemas::{GetFileContentsArgs, GetTreeArgs, GitHubContent, GitHubTreeResponse, TreeItem};
pub use server::{GithubServer, SERVER_NAME};
