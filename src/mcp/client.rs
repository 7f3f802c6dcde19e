// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! MCP client implementation.
//!
//! `McpClient` owns one rmcp client session, normally over a spawned child
//! process. `ConnectionManager` holds one client per configured server.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{CallToolRequestParams, ReadResourceRequestParams};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{IntoTransport, TokioChildProcess};
use rmcp::ServiceExt;
use tokio::process::Command;
use tokio::sync::RwLock;

use super::config::{McpConfig, ServerConfig};
use super::error::McpError;
use super::types::{
    ConnectionState, McpContent, McpResourceInfo, McpToolInfo, McpToolResult, ResourceCatalog,
    ServerInfo, ToolCatalog,
};

#[cfg(feature = "telemetry")]
use std::time::Instant;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Client for a single MCP server connection.
pub struct McpClient {
    name: String,

    config: ServerConfig,

    state: ConnectionState,

    service: Option<RunningService<RoleClient, ()>>,

    /// Server info (after initialization).
    server_info: Option<ServerInfo>,

    /// Tools discovered at connect time, after filtering.
    tools: Vec<McpToolInfo>,

    resources: Vec<McpResourceInfo>,

    last_error: Option<String>,
}

impl McpClient {
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: ConnectionState::Disconnected,
            service: None,
            server_info: None,
            tools: Vec::new(),
            resources: Vec::new(),
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn tools(&self) -> &[McpToolInfo] {
        &self.tools
    }

    pub fn resources(&self) -> &[McpResourceInfo] {
        &self.resources
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(self.config.expanded_args());
        cmd.envs(self.config.expanded_env());
        if let Some(cwd) = &self.config.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Spawn the server process and initialize the session.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        if self.is_ready() {
            return Ok(());
        }

        tracing::debug!(server = %self.name, command = %self.config.command, "spawning MCP server");
        let transport = match TokioChildProcess::new(self.command()) {
            Ok(t) => t,
            Err(e) => {
                let err = McpError::connection_failed(&self.name, e.to_string());
                self.fail(&err);
                return Err(err);
            }
        };

        self.connect_with(transport).await
    }

    /// Initialize a session over an already-open transport.
    pub async fn connect_with<T, E, A>(&mut self, transport: T) -> Result<(), McpError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if self.is_ready() {
            return Ok(());
        }

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        self.state = ConnectionState::Connecting;
        let result = self.initialize(transport).await;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("mcp.client.connect", start.elapsed());

        match result {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                self.last_error = None;
                tracing::info!(
                    server = %self.name,
                    tools = self.tools.len(),
                    resources = self.resources.len(),
                    "MCP server connected"
                );
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&mut self, err: &McpError) {
        tracing::warn!(server = %self.name, error = %err, "MCP server connection failed");
        self.state = ConnectionState::Failed;
        self.last_error = Some(err.to_string());
    }

    async fn initialize<T, E, A>(&mut self, transport: T) -> Result<(), McpError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let timeout_secs = self.config.startup_timeout_sec;
        let service = tokio::time::timeout(Duration::from_secs(timeout_secs), ().serve(transport))
            .await
            .map_err(|_| McpError::ConnectionTimeout {
                server: self.name.clone(),
                timeout_secs,
            })?
            .map_err(|e| McpError::connection_failed(&self.name, e.to_string()))?;

        let info = service.peer_info().map(ServerInfo::from_rmcp);

        let tools: Vec<McpToolInfo> = service
            .list_all_tools()
            .await?
            .iter()
            .filter(|t| self.config.is_tool_enabled(&t.name))
            .map(|t| McpToolInfo::from_rmcp(&self.name, t))
            .collect();

        // Servers without the resources capability reject the request.
        let resources = match &info {
            Some(i) if !i.supports_resources => Vec::new(),
            _ => match service.list_all_resources().await {
                Ok(list) => list
                    .iter()
                    .map(|r| McpResourceInfo::from_rmcp(&self.name, r))
                    .collect(),
                Err(e) => {
                    tracing::debug!(server = %self.name, error = %e, "resource listing unavailable");
                    Vec::new()
                }
            },
        };

        self.server_info = info;
        self.tools = tools;
        self.resources = resources;
        self.service = Some(service);
        Ok(())
    }

    fn service(&self) -> Result<&RunningService<RoleClient, ()>, McpError> {
        match (&self.service, self.state) {
            (Some(service), ConnectionState::Connected) => Ok(service),
            _ => Err(McpError::NotReady(self.name.clone())),
        }
    }

    /// Re-query the server's tool list.
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolInfo>, McpError> {
        let tools: Vec<McpToolInfo> = self
            .service()?
            .list_all_tools()
            .await?
            .iter()
            .filter(|t| self.config.is_tool_enabled(&t.name))
            .map(|t| McpToolInfo::from_rmcp(&self.name, t))
            .collect();
        self.tools = tools.clone();
        Ok(tools)
    }

    /// Re-query the server's resource list.
    pub async fn list_resources(&mut self) -> Result<Vec<McpResourceInfo>, McpError> {
        let resources: Vec<McpResourceInfo> = self
            .service()?
            .list_all_resources()
            .await?
            .iter()
            .map(|r| McpResourceInfo::from_rmcp(&self.name, r))
            .collect();
        self.resources = resources.clone();
        Ok(resources)
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<McpContent>, McpError> {
        let result = self
            .service()?
            .read_resource(ReadResourceRequestParams {
                meta: None,
                uri: uri.to_string(),
            })
            .await?;
        Ok(result
            .contents
            .iter()
            .map(McpContent::from_resource_contents)
            .collect())
    }

    /// Call a tool, bounded by the server's tool timeout.
    ///
    /// A tool that reports `isError` yields `Ok` with `is_error` set. Protocol
    /// failures and timeouts are `Err`.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        if !self.config.is_tool_enabled(tool_name) {
            return Err(McpError::tool_not_found(&self.name, tool_name));
        }

        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            serde_json::Value::Null => None,
            other => {
                return Err(McpError::tool_failed(
                    tool_name,
                    format!("arguments must be a JSON object, got {}", other),
                ))
            }
        };

        let service = self.service()?;
        let params = CallToolRequestParams {
            meta: None,
            name: tool_name.to_string().into(),
            arguments,
            task: None,
        };

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let timeout_secs = self.config.tool_timeout_sec;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            service.call_tool(params),
        )
        .await
        .map_err(|_| McpError::ToolCallTimeout {
            tool: tool_name.to_string(),
            timeout_secs,
        })?
        .map_err(|e| McpError::tool_failed(tool_name, e.to_string()))
        .map(McpToolResult::from_rmcp);

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_tool(
            &format!("mcp.{}.{}", self.name, tool_name),
            start.elapsed(),
            matches!(&result, Ok(r) if !r.is_error),
        );

        result
    }

    /// Close the session. The child process is reaped by rmcp.
    pub async fn disconnect(&mut self) {
        if let Some(service) = self.service.take() {
            if let Err(e) = service.cancel().await {
                tracing::debug!(server = %self.name, error = %e, "MCP service task ended abnormally");
            }
        }
        self.tools.clear();
        self.resources.clear();
        self.state = ConnectionState::Disconnected;
    }
}

/// Manager for multiple MCP server connections, keyed by server name.
#[derive(Default)]
pub struct ConnectionManager {
    clients: BTreeMap<String, Arc<RwLock<McpClient>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every enabled server from a config file. Nothing is spawned.
    pub fn from_config(config: &McpConfig) -> Self {
        let mut manager = Self::new();
        for (name, server) in config.enabled_servers() {
            manager
                .clients
                .insert(name.clone(), Arc::new(RwLock::new(McpClient::new(name.clone(), server.clone()))));
        }
        manager
    }

    /// Add a server configuration and optionally connect.
    pub async fn add_server(
        &mut self,
        name: impl Into<String>,
        config: ServerConfig,
        connect: bool,
    ) -> Result<(), McpError> {
        let name = name.into();
        if self.clients.contains_key(&name) {
            return Err(McpError::AlreadyConnected(name));
        }

        let mut client = McpClient::new(name.clone(), config);
        if connect {
            client.connect().await?;
        }

        self.clients.insert(name, Arc::new(RwLock::new(client)));
        Ok(())
    }

    /// Add a client that was connected elsewhere.
    pub fn insert_client(&mut self, client: McpClient) -> Result<(), McpError> {
        let name = client.name().to_string();
        if self.clients.contains_key(&name) {
            return Err(McpError::AlreadyConnected(name));
        }
        self.clients.insert(name, Arc::new(RwLock::new(client)));
        Ok(())
    }

    /// Disconnect and remove a server. Returns false if it was unknown.
    pub async fn remove_server(&mut self, name: &str) -> bool {
        match self.clients.remove(name) {
            Some(client) => {
                client.write().await.disconnect().await;
                true
            }
            None => false,
        }
    }

    pub fn get_client(&self, name: &str) -> Option<Arc<RwLock<McpClient>>> {
        self.clients.get(name).cloned()
    }

    pub fn server_names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Connect every registered server.
    ///
    /// A server that fails to start is left in the `Failed` state and the
    /// others still connect.
    pub async fn connect_all(&self) -> Vec<(String, Result<(), McpError>)> {
        let mut results = Vec::with_capacity(self.clients.len());
        for (name, client) in &self.clients {
            let result = client.write().await.connect().await;
            results.push((name.clone(), result));
        }
        results
    }

    /// Tools of every connected server, grouped by server name.
    pub async fn list_all_tools(&self) -> ToolCatalog {
        let mut catalog = ToolCatalog::new();
        for (name, client) in &self.clients {
            let guard = client.read().await;
            if guard.is_ready() {
                catalog.insert(name.clone(), guard.tools().to_vec());
            }
        }
        catalog
    }

    /// Resources of every connected server, grouped by server name.
    pub async fn list_all_resources(&self) -> ResourceCatalog {
        let mut catalog = ResourceCatalog::new();
        for (name, client) in &self.clients {
            let guard = client.read().await;
            if guard.is_ready() {
                catalog.insert(name.clone(), guard.resources().to_vec());
            }
        }
        catalog
    }

    /// Read a resource from one server.
    pub async fn read_resource(&self, server: &str, uri: &str) -> Result<Vec<McpContent>, McpError> {
        let client = self
            .clients
            .get(server)
            .ok_or_else(|| McpError::ServerNotFound(server.to_string()))?;
        let guard = client.read().await;
        guard.read_resource(uri).await
    }

    /// Call a tool on a named server.
    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        let client = self
            .clients
            .get(server)
            .ok_or_else(|| McpError::ServerNotFound(server.to_string()))?;

        let guard = client.read().await;
        if guard.is_ready() && !guard.tools().iter().any(|t| t.name == tool) {
            return Err(McpError::tool_not_found(server, tool));
        }
        guard.call_tool(tool, arguments).await
    }

    pub async fn disconnect_all(&self) {
        for client in self.clients.values() {
            client.write().await.disconnect().await;
        }
    }

    /// Connection state and last error of each server.
    pub async fn connection_states(&self) -> BTreeMap<String, (ConnectionState, Option<String>)> {
        let mut states = BTreeMap::new();
        for (name, client) in &self.clients {
            let guard = client.read().await;
            states.insert(
                name.clone(),
                (guard.state(), guard.last_error().map(str::to_string)),
            );
        }
        states
    }
}
