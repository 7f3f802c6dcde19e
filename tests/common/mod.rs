// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use rmcp::ServiceExt;

use mcpdemo::github::{GithubClient, GithubServer};
use mcpdemo::mcp::{ConnectionManager, McpClient, ServerConfig};
use mcpdemo::types::{
    Message, Provider, ProviderResponse, StreamEvent, ToolCall, ToolDefinition,
};
use mcpdemo::ProviderError;

/// Replays scripted responses and records every message list it was given.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    pub seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.stream_chat(messages, tools, system_prompt, Box::new(|_| {}))
            .await
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _system_prompt: Option<&str>,
        on_event: Box<dyn Fn(StreamEvent) + Send + Sync>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ProviderResponse::text("out of script"));
        // Stream the text in two pieces to exercise accumulation.
        let text = response.content.clone();
        if !text.is_empty() {
            let mid = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
            on_event(StreamEvent::TextDelta(text[..mid].to_string()));
            on_event(StreamEvent::TextDelta(text[mid..].to_string()));
        }
        Ok(response)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Answers only after `release` is notified, holding the turn open until then.
pub struct GatedProvider {
    pub release: Arc<tokio::sync::Notify>,
}

impl GatedProvider {
    pub fn new() -> Self {
        Self {
            release: Arc::new(tokio::sync::Notify::new()),
        }
    }
}

#[async_trait]
impl Provider for GatedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.stream_chat(messages, tools, system_prompt, Box::new(|_| {}))
            .await
    }

    async fn stream_chat(
        &self,
        _messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _system_prompt: Option<&str>,
        on_event: Box<dyn Fn(StreamEvent) + Send + Sync>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.release.notified().await;
        on_event(StreamEvent::TextDelta("finally".to_string()));
        Ok(ProviderResponse::text("finally"))
    }

    fn name(&self) -> &str {
        "gated"
    }

    fn model(&self) -> &str {
        "gated-model"
    }
}

/// A model turn that asks the dispatcher for one MCP tool.
pub fn dispatch(id: &str, server: &str, tool: &str, arguments: serde_json::Value) -> ProviderResponse {
    ProviderResponse::with_tool_calls(
        "",
        vec![ToolCall {
            id: id.to_string(),
            name: "call_tool".to_string(),
            input: serde_json::json!({
                "server_name": server,
                "tool_name": tool,
                "arguments": arguments,
            }),
        }],
    )
}

/// "MIT License\nCopyright (c) 2024 Anthropic, PBC.\n", wrapped like GitHub does.
pub const LICENSE_B64: &str = "TUlUIExpY2Vuc2UKQ29weXJpZ2h0\nIChjKSAyMDI0IEFudGhyb3BpYywg\nUEJDLgo=\n";
pub const LICENSE_TEXT: &str = "MIT License\nCopyright (c) 2024 Anthropic, PBC.\n";

async fn mock_contents(Path((owner, repo, path)): Path<(String, String, String)>) -> impl IntoResponse {
    if owner == "modelcontextprotocol" && repo == "python-sdk" && path == "LICENSE" {
        Json(serde_json::json!({
            "name": "LICENSE",
            "path": "LICENSE",
            "encoding": "base64",
            "content": LICENSE_B64,
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"message": "Not Found"})),
        )
            .into_response()
    }
}

async fn mock_tree(Path((_owner, _repo, branch)): Path<(String, String, String)>) -> impl IntoResponse {
    Json(serde_json::json!({
        "sha": branch,
        "url": "https://api.github.com/repos/o/r/git/trees/main",
        "tree": [
            {"path": "README.md", "mode": "100644", "type": "blob", "sha": "a1", "size": 12, "url": "u1"},
            {"path": "src", "mode": "040000", "type": "tree", "sha": "b2", "url": "u2"}
        ],
        "truncated": false
    }))
}

/// Serve a fake GitHub REST API on a random local port.
pub async fn spawn_mock_github() -> String {
    let app = Router::new()
        .route("/repos/{owner}/{repo}/contents/{*path}", get(mock_contents))
        .route("/repos/{owner}/{repo}/git/trees/{branch}", get(mock_tree));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Run the GitHub MCP server in-process and connect a client to it.
pub async fn connect_github(api_url: &str) -> McpClient {
    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let server = GithubServer::new(GithubClient::new(api_url, Some("test-token".to_string())));
    tokio::spawn(async move {
        if let Ok(running) = server.serve(server_io).await {
            let _ = running.waiting().await;
        }
    });

    let mut client = McpClient::new("github", ServerConfig::stdio("github-mcp"));
    client.connect_with(client_io).await.unwrap();
    client
}

/// A manager holding one in-process GitHub server backed by the mock API.
pub async fn github_manager() -> Arc<ConnectionManager> {
    let api_url = spawn_mock_github().await;
    let mut manager = ConnectionManager::new();
    manager.insert_client(connect_github(&api_url).await).unwrap();
    Arc::new(manager)
}
