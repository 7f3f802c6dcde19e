// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Logging and lightweight metrics.
//!
//! Logs are written to stderr so that binaries speaking MCP over stdio keep
//! stdout clean for the protocol.
//!
//! ```rust,ignore
//! use mcpdemo::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Metrics, MetricsSnapshot, OperationMetrics, ToolMetrics, GLOBAL_METRICS};
