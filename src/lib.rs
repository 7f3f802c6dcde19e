// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! mcpdemo - a chat agent wired to Model Context Protocol tool servers.
//!
//! The harness connects to the MCP servers listed in a Claude Desktop style
//! config file, describes their tools and resources to an OpenAI-compatible
//! model, and lets the model call them in a ReAct loop. Output streams to a
//! console REPL or a browser chat page. An example GitHub MCP server ships
//! alongside.
//!
//! # Architecture
//!
//! - [`types`] - Conversation and provider primitives (Message, StreamEvent, ...)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Layered settings (files, environment, CLI)
//! - [`providers`] - OpenAI-compatible chat completions client
//! - [`telemetry`] - Tracing setup and in-process metrics
//! - [`tools`] - Tool handler trait and registry
//! - [`mcp`] - MCP client adapter: connections, catalogs, prompt, tool bridge
//! - [`agent`] - The ReAct loop
//! - [`session`] - History trimming and token estimates
//! - [`streaming`] - Sync-to-async pump and renderers
//! - [`app`] - Assembly of all of the above
//! - [`ui`] - Console REPL and browser UI
//! - [`github`] - Example MCP server for GitHub files and trees
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpdemo::app::App;
//! use mcpdemo::config::{load_config, CliOptions};
//! use mcpdemo::mcp::McpConfig;
//!
//! let config = load_config(".".as_ref(), CliOptions::default())?;
//! let servers = McpConfig::load_from_file(&config.mcp_config)?;
//! let provider = mcpdemo::create_provider(config.provider_config())?;
//! let mut app = App::start(&config, &servers, provider).await?;
//! let answer = app.agent.chat("What license does python-sdk use?").await?;
//! ```

pub mod agent;
pub mod app;
pub mod config;
pub mod error;
pub mod github;
pub mod mcp;
pub mod providers;
pub mod session;
pub mod streaming;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod ui;

// Re-export commonly used types at crate root
pub use error::{AgentError, ConfigError, GithubError, ProviderError, Result, ToolError};
pub use providers::{create_provider, create_provider_from_env, OpenAIProvider};
pub use types::{
    // Message types
    ContentBlock, Message, MessageContent, Role,
    // Tool types
    InputSchema, ToolCall, ToolDefinition,
    // Provider types
    BoxedProvider, Provider, ProviderConfig, ProviderResponse, StopReason, StreamEvent, TokenUsage,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
