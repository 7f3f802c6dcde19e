// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Newline-gated accumulator for streamed text.
//!
//! Deltas are appended to a running buffer. `commit_complete_lines` hands
//! back only the lines finished since the previous commit, and
//! `finalize_and_drain` flushes the trailing partial line.

#[derive(Debug, Default)]
pub struct StreamCollector {
    buffer: String,
    /// Byte offset just past the last committed newline.
    committed: usize,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_delta(&mut self, delta: &str) {
        self.buffer.push_str(delta);
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Lines completed since the last commit, without their newlines.
    pub fn commit_complete_lines(&mut self) -> Vec<String> {
        let pending = &self.buffer[self.committed..];
        let Some(last_newline) = pending.rfind('\n') else {
            return Vec::new();
        };

        let lines = pending[..last_newline]
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        self.committed += last_newline + 1;
        lines
    }

    /// Flush uncommitted content as lines and reset for the next message.
    pub fn finalize_and_drain(&mut self) -> Vec<String> {
        let mut lines = self.commit_complete_lines();
        let rest = &self.buffer[self.committed..];
        if !rest.is_empty() {
            lines.push(rest.to_string());
        }
        self.reset();
        lines
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.committed = 0;
    }
}
