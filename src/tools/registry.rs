// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool registry and handler trait.
//!
//! - [`ToolHandler`] is implemented by everything the model can call
//! - [`ToolRegistry`] maps tool names to handlers and dispatches calls
//! - [`ToolOutput`] carries the text handed back to the model

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info_span, Instrument};

use crate::error::ToolError;
#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;
use crate::types::ToolDefinition;

/// Metrics key shared by every call to a tool that is not registered.
pub const UNKNOWN_TOOL_METRIC: &str = "unknown";

/// Output from executing a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    content: String,
    success: bool,
}

impl ToolOutput {
    /// Create a successful text output.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
        }
    }

    /// Create an error text output.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: false,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get a preview suitable for logging.
    pub fn log_preview(&self, max_bytes: usize) -> String {
        super::truncate_text(&self.content, max_bytes)
    }
}

impl From<ToolError> for ToolOutput {
    fn from(err: ToolError) -> Self {
        Self::error(err.to_string())
    }
}

/// Trait that all tool handlers must implement.
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl ToolHandler for Echo {
///     fn definition(&self) -> ToolDefinition {
///         ToolDefinition::new("echo", "Repeat the input")
///     }
///
///     async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
///         Ok(ToolOutput::success(input.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Returns true if this tool may change state outside the process.
    fn is_mutating(&self) -> bool {
        false
    }

    /// Execute the tool with the given input parameters.
    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Registry of available tools, maps names to handlers.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handler by tool name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All tool definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.values().map(|h| h.definition()).collect()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Dispatch a tool call.
    ///
    /// Never fails: an unknown tool or a handler error becomes an error
    /// output so the model can see what went wrong and try again.
    pub async fn dispatch(&self, tool_name: &str, input: serde_json::Value) -> DispatchResult {
        let start = Instant::now();

        let handler = self.get(tool_name);
        #[cfg(feature = "telemetry")]
        let metric_key = if handler.is_some() {
            tool_name
        } else {
            UNKNOWN_TOOL_METRIC
        };

        let result = match handler {
            Some(handler) => {
                debug!(tool = %tool_name, "Executing tool");
                handler
                    .execute(input)
                    .instrument(info_span!("tool_execute", tool = %tool_name))
                    .await
            }
            None => Err(ToolError::NotFound(tool_name.to_string())),
        };

        let duration = start.elapsed();
        let output = result.unwrap_or_else(|err| {
            debug!(tool = %tool_name, error = %err, "Tool execution failed");
            ToolOutput::from(err)
        });
        let is_error = !output.is_success();

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_tool(metric_key, duration, !is_error);

        debug!(
            tool = %tool_name,
            duration_ms = duration.as_secs_f64() * 1000.0,
            is_error,
            "Tool dispatch finished"
        );

        DispatchResult {
            tool_name: tool_name.to_string(),
            output,
            duration,
            is_error,
        }
    }
}

/// Result of dispatching a tool call.
#[derive(Debug)]
pub struct DispatchResult {
    pub tool_name: String,
    pub output: ToolOutput,
    pub duration: Duration,
    pub is_error: bool,
}

/// Builder for constructing a ToolRegistry.
#[derive(Default)]
pub struct ToolRegistryBuilder {
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> &mut Self {
        self.register_boxed(Arc::new(handler))
    }

    /// Register a shared handler. A later handler with the same name wins.
    pub fn register_boxed(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        let def = handler.definition();
        self.handlers.insert(def.name, handler);
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            handlers: self.handlers,
        }
    }
}
