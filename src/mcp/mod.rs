// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Model Context Protocol (MCP) client adapter.
//!
//! Discovers tools and resources from the configured servers, renders them
//! into a system prompt, and exposes them to the agent as callable tools.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              ConnectionManager              │
//! │  ┌────────────┐          ┌────────────┐    │
//! │  │ McpClient  │   ...    │ McpClient  │    │
//! │  │ (github)   │          │ (other)    │    │
//! │  └─────┬──────┘          └─────┬──────┘    │
//! └────────┼───────────────────────┼───────────┘
//!    ┌─────▼─────┐           ┌─────▼─────┐
//!    │  child    │           │  child    │
//!    │  process  │           │  process  │
//!    └───────────┘           └───────────┘
//! ```
//!
//! ```rust,ignore
//! use mcpdemo::mcp::{ConnectionManager, McpConfig};
//!
//! let config = McpConfig::load_from_file("claude_mcp_config.json")?;
//! let manager = ConnectionManager::from_config(&config);
//! manager.connect_all().await;
//!
//! let tools = manager.list_all_tools().await;
//! let result = manager.call_tool("github", "get_file_contents", args).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;
pub mod tools;
pub mod types;

pub use client::{ConnectionManager, McpClient};
pub use config::{McpConfig, ServerConfig};
pub use error::McpError;
pub use prompt::{build_system_prompt, build_system_prompt_for};
pub use tools::{build_registry, CallToolDispatcher, McpToolWrapper};
pub use types::*;
