// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Application assembly: MCP connections, catalogs, system prompt, agent.
//!
//! Both front ends (console and browser) start from an [`App`] and drive
//! turns through [`stream_turn`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::agent::{Agent, AgentCallbacks, AgentConfig, AgentOptions};
use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::mcp::{
    build_registry, build_system_prompt_for, ConnectionManager, McpConfig, ResourceCatalog,
    ToolCatalog,
};
use crate::streaming::{PumpEvent, PumpSender};
use crate::types::BoxedProvider;

/// A connected harness, ready to chat.
pub struct App {
    pub manager: Arc<ConnectionManager>,
    pub tools: ToolCatalog,
    pub resources: ResourceCatalog,
    pub agent: Agent,
}

impl App {
    /// Spawn and connect every enabled server, then assemble the agent.
    ///
    /// A server that fails to start is logged and left out of the catalogs.
    pub async fn start(
        config: &ResolvedConfig,
        servers: &McpConfig,
        provider: BoxedProvider,
    ) -> Result<Self> {
        let manager = connect_servers(servers).await;
        Self::assemble(Arc::new(manager), provider, config).await
    }

    /// Assemble the agent over an already connected manager.
    pub async fn assemble(
        manager: Arc<ConnectionManager>,
        provider: BoxedProvider,
        config: &ResolvedConfig,
    ) -> Result<Self> {
        let tools = manager.list_all_tools().await;
        let resources = manager.list_all_resources().await;

        let system_prompt = build_system_prompt_for(
            config.tool_mode,
            &tools,
            &resources,
            config.system_prompt_additions.as_deref(),
        );
        let registry = build_registry(manager.clone(), config.tool_mode).await;
        info!(
            servers = tools.len(),
            tools = tools.values().map(Vec::len).sum::<usize>(),
            mode = %config.tool_mode,
            "Harness assembled"
        );

        let agent = Agent::new(AgentOptions {
            provider,
            tool_registry: Arc::new(registry),
            system_prompt: Some(system_prompt),
            config: agent_config(config),
            callbacks: AgentCallbacks::default(),
        });

        Ok(Self {
            manager,
            tools,
            resources,
            agent,
        })
    }

    pub async fn shutdown(&self) {
        self.manager.disconnect_all().await;
    }
}

/// Connect all enabled servers from a config, logging the ones that fail.
pub async fn connect_servers(servers: &McpConfig) -> ConnectionManager {
    let manager = ConnectionManager::from_config(servers);
    for (name, result) in manager.connect_all().await {
        if let Err(e) = result {
            warn!(server = %name, error = %e, "MCP server failed to start");
        }
    }
    manager
}

pub fn agent_config(config: &ResolvedConfig) -> AgentConfig {
    AgentConfig {
        max_iterations: config.max_iterations as usize,
        history_window: config.history_window,
        ..Default::default()
    }
}

/// Run one agent turn, forwarding its output into a pump.
///
/// The turn always ends with exactly one terminal event: `Done` with the
/// final text, or `Error`.
pub async fn stream_turn(
    agent: &mut Agent,
    input: &str,
    tx: &PumpSender,
    cancel_rx: Option<watch::Receiver<bool>>,
) -> Result<String> {
    agent.set_callbacks(tx.agent_callbacks());
    let result = match cancel_rx {
        Some(rx) => agent.chat_with_cancel(input, rx).await,
        None => agent.chat(input).await,
    };
    // Release the callbacks' sender clones so the consumer sees the end.
    agent.set_callbacks(AgentCallbacks::default());

    match &result {
        Ok(text) => tx.send(PumpEvent::Done { text: text.clone() }),
        Err(e) => tx.send(PumpEvent::error(e.to_string())),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::streaming::StreamPump;
    use crate::types::{Message, Provider, ProviderResponse, StreamEvent, ToolDefinition};
    use async_trait::async_trait;

    struct Hello;

    #[async_trait]
    impl Provider for Hello {
        async fn chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _system_prompt: Option<&str>,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse::text("Hello there"))
        }

        async fn stream_chat(
            &self,
            _messages: &[Message],
            _tools: Option<&[ToolDefinition]>,
            _system_prompt: Option<&str>,
            on_event: Box<dyn Fn(StreamEvent) + Send + Sync>,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            on_event(StreamEvent::TextDelta("Hello ".to_string()));
            on_event(StreamEvent::TextDelta("there".to_string()));
            Ok(ProviderResponse::text("Hello there"))
        }

        fn name(&self) -> &str {
            "hello"
        }

        fn model(&self) -> &str {
            "hello-1"
        }
    }

    #[tokio::test]
    async fn test_assemble_without_servers() {
        let app = App::assemble(
            Arc::new(ConnectionManager::new()),
            Box::new(Hello),
            &ResolvedConfig::default(),
        )
        .await
        .unwrap();

        assert!(app.tools.is_empty());
        assert!(app.agent.system_prompt().contains("No MCP servers are connected"));
        assert_eq!(app.agent.tool_registry().tool_names(), vec!["call_tool"]);
        assert_eq!(app.agent.config().history_window, 20);
    }

    #[tokio::test]
    async fn test_stream_turn_ends_with_done() {
        let mut app = App::assemble(
            Arc::new(ConnectionManager::new()),
            Box::new(Hello),
            &ResolvedConfig::default(),
        )
        .await
        .unwrap();

        let pump = StreamPump::new();
        let tx = pump.sender();
        let text = stream_turn(&mut app.agent, "hi", &tx, None).await.unwrap();
        drop(tx);
        assert_eq!(text, "Hello there");

        let events: Vec<PumpEvent> = tokio_stream::StreamExt::collect(pump.into_stream()).await;
        assert_eq!(events.first(), Some(&PumpEvent::text("Hello ")));
        assert_eq!(
            events.last(),
            Some(&PumpEvent::Done {
                text: "Hello there".to_string()
            })
        );
        assert_eq!(app.agent.history().len(), 2);
    }
}
