// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent types and configuration.

use std::sync::Arc;

use serde::Serialize;

use crate::config::DEFAULT_HISTORY_WINDOW;
use crate::tools::ToolRegistry;
use crate::types::{BoxedProvider, Message};

/// Statistics for a single turn (user message -> final response).
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnStats {
    /// Model round trips in this turn.
    pub iterations: usize,
    pub tool_call_count: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub duration_ms: u64,
    pub tool_calls: Vec<TurnToolCall>,
}

/// Statistics for a single tool call.
#[derive(Debug, Clone, Serialize)]
pub struct TurnToolCall {
    pub name: String,
    pub duration_ms: u64,
    pub is_error: bool,
}

/// Totals over the life of an agent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentStats {
    pub turns: u64,
    pub messages: usize,
    /// Coarse estimate of the current history size.
    pub estimated_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: u64,
    pub tool_errors: u64,
}

/// Callbacks for agent events.
///
/// Uses `Arc` instead of `Box` so callbacks can be cloned into streaming
/// closures and background tasks without lifetime issues.
#[derive(Clone, Default)]
pub struct AgentCallbacks {
    /// Called when the model outputs text (streaming deltas).
    pub on_text: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    /// Called when a tool is about to be executed (tool_id, tool_name, input).
    pub on_tool_call: Option<Arc<dyn Fn(&str, &str, &serde_json::Value) + Send + Sync>>,
    /// Called when a tool execution completes (tool_id, tool_name, result, is_error).
    pub on_tool_result: Option<Arc<dyn Fn(&str, &str, &str, bool) + Send + Sync>>,
    /// Called when a turn completes, with the final text and stats.
    pub on_turn_complete: Option<Arc<dyn Fn(&str, &TurnStats) + Send + Sync>>,
}

impl std::fmt::Debug for AgentCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCallbacks")
            .field("on_text", &self.on_text.is_some())
            .field("on_tool_call", &self.on_tool_call.is_some())
            .field("on_tool_result", &self.on_tool_result.is_some())
            .field("on_turn_complete", &self.on_turn_complete.is_some())
            .finish()
    }
}

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum model round trips per turn.
    pub max_iterations: usize,
    /// Consecutive failing tool rounds before the turn stops.
    pub max_consecutive_errors: usize,
    /// Maximum turn duration in milliseconds.
    pub max_turn_duration_ms: u64,
    /// Messages kept when a turn starts. 0 keeps everything.
    pub history_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            max_consecutive_errors: 3,
            max_turn_duration_ms: 10 * 60 * 1000,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

/// Options for creating an agent.
pub struct AgentOptions {
    pub provider: BoxedProvider,
    pub tool_registry: Arc<ToolRegistry>,
    pub system_prompt: Option<String>,
    pub config: AgentConfig,
    pub callbacks: AgentCallbacks,
}

/// Internal state of the agent.
#[derive(Debug, Default)]
pub struct AgentState {
    pub messages: Vec<Message>,
    pub current_iteration: usize,
    pub consecutive_errors: usize,
    pub totals: AgentStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_debug_lists_hooks() {
        let callbacks = AgentCallbacks {
            on_text: Some(Arc::new(|_: &str| {})),
            ..Default::default()
        };
        assert_eq!(
            format!("{:?}", callbacks),
            "AgentCallbacks { on_text: true, on_tool_call: false, on_tool_result: false, on_turn_complete: false }"
        );
    }
}
