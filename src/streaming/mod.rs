// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Streaming output from the agent to the console and the browser.
//!
//! ```text
//!  provider stream ──► AgentCallbacks (sync) ──► PumpSender
//!                                                    │ unbounded mpsc
//!                                                    ▼
//!                                               StreamPump
//!                                      ┌─────────────┴────────────┐
//!                                      ▼                          ▼
//!                                 ConsoleSink                sse_event()
//!                            (stdout, flushed)            (axum Sse body)
//! ```
//!
//! The agent appends the final text to the history itself; consumers only
//! render.

mod collector;
mod console;
mod pump;
mod sse;

pub use collector::StreamCollector;
pub use console::ConsoleSink;
pub use pump::{PumpEvent, PumpSender, StreamPump};
pub use sse::sse_event;
