// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The GitHub MCP server driven through a real rmcp client.

mod common;

use mcpdemo::github::GitHubTreeResponse;
use mcpdemo::mcp::{ConnectionState, McpError};

use common::{connect_github, spawn_mock_github, LICENSE_TEXT};

#[tokio::test]
async fn test_lists_two_tools_and_no_resources() {
    let api = spawn_mock_github().await;
    let client = connect_github(&api).await;

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.server_info().unwrap().name, "github");

    let mut names: Vec<_> = client.tools().iter().map(|t| t.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["get_file_contents", "list_repo_tree"]);
    assert!(client.resources().is_empty());

    let get = client
        .tools()
        .iter()
        .find(|t| t.name == "get_file_contents")
        .unwrap();
    assert_eq!(
        get.description.as_deref(),
        Some("Retrieve the file contents of a file from a github repository")
    );
    assert_eq!(get.input_schema["properties"]["owner"]["type"], "string");
}

#[tokio::test]
async fn test_get_file_contents_decodes_base64() {
    let api = spawn_mock_github().await;
    let client = connect_github(&api).await;

    let result = client
        .call_tool(
            "get_file_contents",
            serde_json::json!({
                "owner": "modelcontextprotocol",
                "repo": "python-sdk",
                "path": "LICENSE"
            }),
        )
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.as_text(), LICENSE_TEXT);
}

#[tokio::test]
async fn test_missing_file_is_tool_error() {
    let api = spawn_mock_github().await;
    let client = connect_github(&api).await;

    let result = client
        .call_tool(
            "get_file_contents",
            serde_json::json!({"owner": "o", "repo": "r", "path": "nope.txt"}),
        )
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.as_text().contains("404"));
    assert!(result.as_text().contains("Not Found"));
}

#[tokio::test]
async fn test_list_repo_tree_defaults() {
    let api = spawn_mock_github().await;
    let client = connect_github(&api).await;

    let result = client
        .call_tool("list_repo_tree", serde_json::json!({"owner": "o", "repo": "r"}))
        .await
        .unwrap();
    assert!(!result.is_error);

    let tree: GitHubTreeResponse = serde_json::from_str(&result.as_text()).unwrap();
    // The mock echoes the branch back as the sha.
    assert_eq!(tree.sha, "main");
    assert_eq!(tree.tree.len(), 2);
    assert_eq!(tree.tree[1].kind, "tree");
    assert!(!tree.truncated);
}

#[tokio::test]
async fn test_unknown_tool_rejected() {
    let api = spawn_mock_github().await;
    let client = connect_github(&api).await;

    let err = client
        .call_tool("delete_repo", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::ToolCallFailed { .. }));
}
