// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process counters for tool calls, model requests and tokens.
//!
//! Exposed by `/stats` in the console and `GET /api/stats` in the web UI.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::Serialize;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    tools: RwLock<BTreeMap<String, ToolMetrics>>,
    operations: RwLock<BTreeMap<String, OperationMetrics>>,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    turns: AtomicU64,
    start_time: Instant,
}

// A poisoned lock only means a panic happened mid-update of a counter.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            operations: RwLock::new(BTreeMap::new()),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            turns: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a tool execution.
    pub fn record_tool(&self, name: &str, duration: Duration, success: bool) {
        write(&self.tools)
            .entry(name.to_string())
            .or_default()
            .record(duration, success);
    }

    /// Record a timed operation such as a model request.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        write(&self.operations)
            .entry(name.to_string())
            .or_default()
            .record(duration);
    }

    /// Record token usage.
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
    }

    /// Record one completed agent turn.
    pub fn record_turn(&self) {
        self.turns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tool_metrics(&self, name: &str) -> Option<ToolMetrics> {
        read(&self.tools).get(name).cloned()
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tools: read(&self.tools).clone(),
            operations: read(&self.operations).clone(),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            turns: self.turns.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        write(&self.tools).clear();
        write(&self.operations).clear();
        self.input_tokens.store(0, Ordering::Relaxed);
        self.output_tokens.store(0, Ordering::Relaxed);
        self.turns.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for a specific tool.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolMetrics {
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(serialize_with = "as_millis")]
    pub total_duration: Duration,
}

impl ToolMetrics {
    pub fn record(&mut self, duration: Duration, success: bool) {
        self.invocations += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
    }

    pub fn avg_duration(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.invocations as u32
        }
    }
}

/// Count and total time of a named operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationMetrics {
    pub count: u64,
    #[serde(serialize_with = "as_millis")]
    pub total_duration: Duration,
}

impl OperationMetrics {
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Point-in-time copy of all metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tools: BTreeMap<String, ToolMetrics>,
    pub operations: BTreeMap<String, OperationMetrics>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub turns: u64,
    pub uptime_secs: u64,
}

impl MetricsSnapshot {
    /// Human-readable report for the console.
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Turns: {}  Tokens: {} in / {} out  Uptime: {}s\n",
            self.turns, self.input_tokens, self.output_tokens, self.uptime_secs
        ));
        if self.tools.is_empty() {
            out.push_str("No tool calls yet.\n");
        }
        for (name, m) in &self.tools {
            out.push_str(&format!(
                "  {:<40} {:>4} calls  {:>4} failed  avg {:?}\n",
                name,
                m.invocations,
                m.failures,
                m.avg_duration()
            ));
        }
        out
    }
}
