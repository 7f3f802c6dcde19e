// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Console rendering of pump events.

use std::io::{self, IsTerminal, Write};

use colored::Colorize;

use super::collector::StreamCollector;
use super::pump::PumpEvent;

/// Longest tool result preview shown inline.
const RESULT_PREVIEW_CHARS: usize = 200;

/// Prints streamed text and tool activity in dim colour.
///
/// Text is written delta by delta on a terminal. With `line_gated` set it is
/// held back until each line completes, which keeps piped output and
/// interleaved stderr logs readable.
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
    /// Text of the current message, since the last tool line or `Done`.
    collector: StreamCollector,
    show_tools: bool,
    line_gated: bool,
}

impl ConsoleSink<io::Stdout> {
    /// Gates on whole lines when stdout is not a terminal.
    pub fn stdout(show_tools: bool) -> Self {
        let gated = !io::stdout().is_terminal();
        Self::new(io::stdout(), show_tools).line_gated(gated)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, show_tools: bool) -> Self {
        Self {
            out,
            collector: StreamCollector::new(),
            show_tools,
            line_gated: false,
        }
    }

    pub fn line_gated(mut self, gated: bool) -> Self {
        self.line_gated = gated;
        self
    }

    /// Render one event.
    pub fn handle(&mut self, event: &PumpEvent) -> io::Result<()> {
        match event {
            PumpEvent::Text { text } => {
                self.collector.push_delta(text);
                let lines = self.collector.commit_complete_lines();
                if self.line_gated {
                    for line in lines {
                        writeln!(self.out, "{}", line)?;
                    }
                } else {
                    write!(self.out, "{}", text)?;
                }
            }
            PumpEvent::ToolCall { name, input } if self.show_tools => {
                self.end_message()?;
                let line = format!("-> {} {}", name, input);
                writeln!(self.out, "{}", line.dimmed())?;
            }
            PumpEvent::ToolResult {
                name,
                output,
                is_error,
            } if self.show_tools => {
                self.end_message()?;
                let preview = preview(output);
                if *is_error {
                    writeln!(self.out, "{}", format!("<- {} failed: {}", name, preview).red().dimmed())?;
                } else {
                    writeln!(self.out, "{}", format!("<- {}: {}", name, preview).dimmed())?;
                }
            }
            PumpEvent::ToolCall { .. } | PumpEvent::ToolResult { .. } => {}
            PumpEvent::Done { .. } => self.end_message()?,
            PumpEvent::Error { message } => {
                self.end_message()?;
                writeln!(self.out, "{} {}", "Error:".red().bold(), message)?;
            }
        }
        self.out.flush()
    }

    /// Finish the partial line, if any, and start a new message.
    fn end_message(&mut self) -> io::Result<()> {
        let tail = self.collector.finalize_and_drain();
        if self.line_gated {
            for line in tail {
                writeln!(self.out, "{}", line)?;
            }
        } else if !tail.is_empty() {
            // Complete lines were already written; only the cursor needs moving.
            writeln!(self.out)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn preview(output: &str) -> String {
    let single_line = output.replace('\n', " ");
    if single_line.chars().count() <= RESULT_PREVIEW_CHARS {
        single_line
    } else {
        let cut: String = single_line.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
