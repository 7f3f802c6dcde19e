// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The `github` MCP server.

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ListResourcesResult, PaginatedRequestParams,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler};
use tracing::warn;

use super::client::GithubClient;
use super::schemas::{GetFileContentsArgs, GetTreeArgs};
use crate::error::GithubError;

pub const SERVER_NAME: &str = "github";

/// Stateless tool handler: every call is one REST request.
#[derive(Clone)]
pub struct GithubServer {
    client: GithubClient,
    tool_router: ToolRouter<Self>,
}

// API failures are reported to the model as tool errors, not protocol errors.
fn tool_error(tool: &str, err: GithubError) -> CallToolResult {
    warn!(tool, error = %err, "GitHub call failed");
    CallToolResult::error(vec![Content::text(err.to_string())])
}

#[tool_router]
impl GithubServer {
    pub fn new(client: GithubClient) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(GithubClient::from_env())
    }

    #[tool(description = "Retrieve the file contents of a file from a github repository")]
    async fn get_file_contents(
        &self,
        Parameters(args): Parameters<GetFileContentsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(match self.client.get_file_contents(&args).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => tool_error("get_file_contents", e),
        })
    }

    #[tool(description = "List the tree structure of a GitHub repository")]
    async fn list_repo_tree(
        &self,
        Parameters(args): Parameters<GetTreeArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let tree = match self.client.list_repo_tree(&args).await {
            Ok(tree) => tree,
            Err(e) => return Ok(tool_error("list_repo_tree", e)),
        };
        let json = serde_json::to_string(&tree)
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for GithubServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some("Read files and list trees of GitHub repositories.".to_string()),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info() {
        let server = GithubServer::new(GithubClient::new("http://localhost:1", None));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "github");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_router_lists_both_tools() {
        let server = GithubServer::new(GithubClient::new("http://localhost:1", None));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["get_file_contents", "list_repo_tree"]);
    }
}
