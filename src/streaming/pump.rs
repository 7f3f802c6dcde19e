// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bridge from the agent's synchronous callbacks to an async consumer.
//!
//! The provider reports stream events through plain `Fn` callbacks that
//! must not block. [`PumpSender`] turns each callback into a message on an
//! unbounded channel, and [`StreamPump`] hands them to whoever renders them:
//! the console loop or an SSE response.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::agent::AgentCallbacks;

/// One unit of streamed agent output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PumpEvent {
    /// Assistant text delta.
    Text { text: String },

    ToolCall {
        name: String,
        input: serde_json::Value,
    },

    ToolResult {
        name: String,
        output: String,
        is_error: bool,
    },

    /// The turn finished. `text` is the final assistant message.
    Done { text: String },

    Error { message: String },
}

impl PumpEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Cheap, clonable, non-blocking sending half.
#[derive(Debug, Clone)]
pub struct PumpSender {
    tx: mpsc::UnboundedSender<PumpEvent>,
}

impl PumpSender {
    /// Queue an event. Dropped silently once the consumer has gone away.
    pub fn send(&self, event: PumpEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("stream consumer dropped, discarding event");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Agent callbacks that forward every event into this pump.
    pub fn agent_callbacks(&self) -> AgentCallbacks {
        let text_tx = self.clone();
        let call_tx = self.clone();
        let result_tx = self.clone();
        AgentCallbacks {
            on_text: Some(Arc::new(move |text: &str| {
                text_tx.send(PumpEvent::text(text));
            })),
            on_tool_call: Some(Arc::new(
                move |_id: &str, name: &str, input: &serde_json::Value| {
                    call_tx.send(PumpEvent::ToolCall {
                        name: name.to_string(),
                        input: input.clone(),
                    });
                },
            )),
            on_tool_result: Some(Arc::new(
                move |_id: &str, name: &str, output: &str, is_error: bool| {
                    result_tx.send(PumpEvent::ToolResult {
                        name: name.to_string(),
                        output: output.to_string(),
                        is_error,
                    });
                },
            )),
            ..Default::default()
        }
    }
}

/// Receiving half.
#[derive(Debug)]
pub struct StreamPump {
    tx: mpsc::UnboundedSender<PumpEvent>,
    rx: mpsc::UnboundedReceiver<PumpEvent>,
}

impl Default for StreamPump {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamPump {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> PumpSender {
        PumpSender {
            tx: self.tx.clone(),
        }
    }

    /// Next event. Returns `None` once every sender is gone and the queue is
    /// drained.
    pub async fn next(&mut self) -> Option<PumpEvent> {
        self.rx.recv().await
    }

    /// Event without waiting, if one is queued.
    pub fn try_next(&mut self) -> Option<PumpEvent> {
        self.rx.try_recv().ok()
    }

    /// Convert into a `Stream`. The pump's own sender is dropped, so the
    /// stream ends when the last outside sender does.
    pub fn into_stream(self) -> UnboundedReceiverStream<PumpEvent> {
        drop(self.tx);
        UnboundedReceiverStream::new(self.rx)
    }
}
