// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent module: the ReAct loop.
//!
//! The agent sends the conversation to the model, runs any tools the model
//! asks for, feeds the results back, and repeats until the model answers
//! without calling a tool.
//!
//! ```rust,ignore
//! use mcpdemo::agent::{Agent, AgentCallbacks, AgentConfig, AgentOptions};
//!
//! let mut agent = Agent::new(AgentOptions {
//!     provider,
//!     tool_registry: Arc::new(registry),
//!     system_prompt: Some(prompt),
//!     config: AgentConfig::default(),
//!     callbacks: AgentCallbacks::default(),
//! });
//!
//! let answer = agent.chat("What license does python-sdk use?").await?;
//! ```

mod types;

pub use types::{
    AgentCallbacks, AgentConfig, AgentOptions, AgentState, AgentStats, TurnStats, TurnToolCall,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{AgentError, Result};
use crate::session;
use crate::tools::ToolRegistry;
use crate::types::{BoxedProvider, ContentBlock, Message, Role, StreamEvent, ToolCall, ToolDefinition};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Outcome of one tool call, paired with the call that produced it.
struct ToolOutcome {
    tool_use_id: String,
    content: String,
    is_error: bool,
}

pub struct Agent {
    provider: BoxedProvider,
    tool_registry: Arc<ToolRegistry>,
    system_prompt: String,
    config: AgentConfig,
    callbacks: AgentCallbacks,
    state: AgentState,
}

impl Agent {
    pub fn new(options: AgentOptions) -> Self {
        Self {
            provider: options.provider,
            tool_registry: options.tool_registry,
            system_prompt: options
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            config: options.config,
            callbacks: options.callbacks,
            state: AgentState::default(),
        }
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.state.messages
    }

    /// Forget the conversation. Lifetime totals are kept.
    pub fn clear_history(&mut self) {
        self.state.messages.clear();
        self.state.current_iteration = 0;
        self.state.consecutive_errors = 0;
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Replace the callbacks, e.g. to route one turn's events to a new sink.
    pub fn set_callbacks(&mut self, callbacks: AgentCallbacks) {
        self.callbacks = callbacks;
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            messages: self.state.messages.len(),
            estimated_tokens: session::estimate_tokens(&self.state.messages),
            ..self.state.totals.clone()
        }
    }

    fn tool_definitions(&self) -> Option<Vec<ToolDefinition>> {
        if self.tool_registry.is_empty() {
            None
        } else {
            Some(self.tool_registry.definitions())
        }
    }

    /// Execute a single tool call.
    async fn execute_tool(&self, tool_call: &ToolCall) -> ToolOutcome {
        if let Some(ref on_tool_call) = self.callbacks.on_tool_call {
            on_tool_call(&tool_call.id, &tool_call.name, &tool_call.input);
        }

        let dispatch = self
            .tool_registry
            .dispatch(&tool_call.name, tool_call.input.clone())
            .await;

        let outcome = ToolOutcome {
            tool_use_id: tool_call.id.clone(),
            content: dispatch.output.content().to_string(),
            is_error: dispatch.is_error,
        };

        if let Some(ref on_tool_result) = self.callbacks.on_tool_result {
            on_tool_result(
                &tool_call.id,
                &tool_call.name,
                &outcome.content,
                outcome.is_error,
            );
        }

        outcome
    }

    /// Run every tool call of one model response, in order.
    async fn process_tool_calls(
        &self,
        tool_calls: &[ToolCall],
        turn_stats: &mut TurnStats,
    ) -> (Vec<ToolOutcome>, bool) {
        let mut results = Vec::with_capacity(tool_calls.len());
        let mut has_error = false;

        for tool_call in tool_calls {
            let start = Instant::now();
            let result = self.execute_tool(tool_call).await;

            turn_stats.tool_call_count += 1;
            turn_stats.tool_calls.push(TurnToolCall {
                name: tool_call.name.clone(),
                duration_ms: start.elapsed().as_millis() as u64,
                is_error: result.is_error,
            });
            has_error |= result.is_error;
            results.push(result);
        }

        (results, has_error)
    }

    fn add_tool_results(&mut self, results: Vec<ToolOutcome>) {
        let blocks: Vec<ContentBlock> = results
            .into_iter()
            .map(|r| ContentBlock::tool_result(r.tool_use_id, r.content, r.is_error))
            .collect();
        self.state
            .messages
            .push(Message::with_blocks(Role::User, blocks));
    }

    /// Run one turn: send the user message, handle tool calls, and return the
    /// final text response.
    pub async fn chat(&mut self, user_message: &str) -> Result<String> {
        self.chat_internal(user_message, None).await
    }

    /// Like [`Agent::chat`], but stops with [`AgentError::UserCancelled`] as
    /// soon as `cancel_rx` turns true.
    pub async fn chat_with_cancel(
        &mut self,
        user_message: &str,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<String> {
        self.chat_internal(user_message, Some(cancel_rx)).await
    }

    async fn chat_internal(
        &mut self,
        user_message: &str,
        mut cancel_rx: Option<watch::Receiver<bool>>,
    ) -> Result<String> {
        let start_time = Instant::now();
        let max_duration = Duration::from_millis(self.config.max_turn_duration_ms);
        let mut turn_stats = TurnStats::default();

        self.state.messages.push(Message::user(user_message));
        let trimmed = session::trim_history(&mut self.state.messages, self.config.history_window);
        if trimmed > 0 {
            debug!(trimmed, "dropped old messages from the history window");
        }

        self.state.current_iteration = 0;
        self.state.consecutive_errors = 0;

        let mut final_response = String::new();
        let mut stopped_early = false;

        loop {
            if cancel_rx.as_ref().is_some_and(|rx| *rx.borrow()) {
                return Err(AgentError::UserCancelled.into());
            }

            self.state.current_iteration += 1;
            if self.state.current_iteration > self.config.max_iterations {
                append_note(&mut final_response, "(Reached iteration limit, stopping)");
                stopped_early = true;
                break;
            }
            if start_time.elapsed() > max_duration {
                append_note(&mut final_response, "(Reached time limit, stopping)");
                stopped_early = true;
                break;
            }

            let tools = self.tool_definitions();

            // Arc clones are cheap.
            let on_text = self.callbacks.on_text.clone();
            let on_event = Box::new(move |event: StreamEvent| {
                if let StreamEvent::TextDelta(ref text) = event {
                    if let Some(ref cb) = on_text {
                        cb(text);
                    }
                }
            });

            #[cfg(feature = "telemetry")]
            let request_start = Instant::now();

            let request = self.provider.stream_chat(
                &self.state.messages,
                tools.as_deref(),
                Some(self.system_prompt.as_str()),
                on_event,
            );
            let response = match cancel_rx.as_mut() {
                Some(rx) => tokio::select! {
                    res = request => res.map_err(AgentError::from)?,
                    _ = wait_cancelled(rx) => return Err(AgentError::UserCancelled.into()),
                },
                None => request.await.map_err(AgentError::from)?,
            };

            #[cfg(feature = "telemetry")]
            GLOBAL_METRICS.record_operation("agent.model_request", request_start.elapsed());

            turn_stats.iterations += 1;
            if let Some(ref usage) = response.usage {
                turn_stats.input_tokens += usage.input_tokens as u64;
                turn_stats.output_tokens += usage.output_tokens as u64;
                turn_stats.total_tokens = turn_stats.input_tokens + turn_stats.output_tokens;
            }

            if !response.content.is_empty() {
                final_response = response.content.clone();
            }

            let mut assistant_blocks: Vec<ContentBlock> = Vec::new();
            if !response.content.is_empty() {
                assistant_blocks.push(ContentBlock::text(&response.content));
            }
            for tc in &response.tool_calls {
                assistant_blocks.push(ContentBlock::tool_use(&tc.id, &tc.name, tc.input.clone()));
            }
            if !assistant_blocks.is_empty() {
                self.state
                    .messages
                    .push(Message::with_blocks(Role::Assistant, assistant_blocks));
            }

            if response.tool_calls.is_empty() {
                break;
            }

            let processed = match cancel_rx.as_mut() {
                Some(rx) => tokio::select! {
                    res = self.process_tool_calls(&response.tool_calls, &mut turn_stats) => Some(res),
                    _ = wait_cancelled(rx) => None,
                },
                None => Some(
                    self.process_tool_calls(&response.tool_calls, &mut turn_stats)
                        .await,
                ),
            };
            let Some((results, has_error)) = processed else {
                // Every tool_use needs a result or the next request is rejected.
                let cancelled = response
                    .tool_calls
                    .iter()
                    .map(|tc| ToolOutcome {
                        tool_use_id: tc.id.clone(),
                        content: "Cancelled by user".to_string(),
                        is_error: true,
                    })
                    .collect();
                self.add_tool_results(cancelled);
                return Err(AgentError::UserCancelled.into());
            };
            self.add_tool_results(results);

            if has_error {
                self.state.consecutive_errors += 1;
                if self.state.consecutive_errors >= self.config.max_consecutive_errors {
                    append_note(&mut final_response, "(Stopping due to repeated errors)");
                    stopped_early = true;
                    break;
                }
            } else {
                self.state.consecutive_errors = 0;
            }
        }

        // A limit stop leaves tool results last; close the turn with the answer.
        if stopped_early {
            self.state
                .messages
                .push(Message::assistant(final_response.as_str()));
        }

        turn_stats.duration_ms = start_time.elapsed().as_millis() as u64;

        let totals = &mut self.state.totals;
        totals.turns += 1;
        totals.input_tokens += turn_stats.input_tokens;
        totals.output_tokens += turn_stats.output_tokens;
        totals.tool_calls += turn_stats.tool_call_count as u64;
        totals.tool_errors += turn_stats.tool_calls.iter().filter(|t| t.is_error).count() as u64;

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation("agent.chat", start_time.elapsed());
            GLOBAL_METRICS.record_tokens(turn_stats.input_tokens, turn_stats.output_tokens);
            GLOBAL_METRICS.record_turn();
        }

        info!(
            iterations = turn_stats.iterations,
            tool_calls = turn_stats.tool_call_count,
            duration_ms = turn_stats.duration_ms,
            "turn complete"
        );

        if let Some(ref on_turn_complete) = self.callbacks.on_turn_complete {
            on_turn_complete(&final_response, &turn_stats);
        }

        Ok(final_response)
    }
}

fn append_note(text: &mut String, note: &str) {
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(note);
}

/// Resolve once the flag turns true. Never resolves if the sender is dropped
/// while the flag is still false.
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    let result = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
    if result.is_err() {
        std::future::pending::<()>().await;
    }
}
