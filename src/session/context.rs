// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Conversation windowing and token estimates.

#[cfg(feature = "telemetry")]
use std::time::Instant;

use crate::types::{ContentBlockType, Message, MessageContent, Role};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Approximate characters per token.
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and formatting.
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

/// Trim a conversation to its last `max_items` messages, in place.
///
/// The kept window always starts on a user message that is not just tool
/// results, so no tool result is separated from the call that produced it.
/// `max_items == 0` disables trimming. Returns the number of messages removed.
pub fn trim_history(messages: &mut Vec<Message>, max_items: usize) -> usize {
    if max_items == 0 || messages.len() <= max_items {
        return 0;
    }

    #[cfg(feature = "telemetry")]
    let start = Instant::now();

    let mut cut = messages.len() - max_items;
    cut += find_safe_start_index(&messages[cut..]);
    messages.drain(..cut);

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("session.trim_history", start.elapsed());

    tracing::debug!(removed = cut, kept = messages.len(), "trimmed conversation history");
    cut
}

/// Index of the first message a window may start on.
///
/// Returns `messages.len()` if there is none.
pub fn find_safe_start_index(messages: &[Message]) -> usize {
    messages
        .iter()
        .position(|m| m.role == Role::User && !m.is_tool_results_only())
        .unwrap_or(messages.len())
}

/// Coarse token estimate for a list of messages.
pub fn estimate_tokens(messages: &[Message]) -> u64 {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Coarse token estimate for one message.
pub fn estimate_message_tokens(message: &Message) -> u64 {
    estimate_text_tokens(&get_message_text(message)) + MESSAGE_OVERHEAD_TOKENS
}

pub fn estimate_text_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN) as u64
}

/// All text carried by a message, tool calls and results included.
pub fn get_message_text(message: &Message) -> String {
    match &message.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => {
            let mut result = String::new();
            for block in blocks {
                match block.block_type {
                    ContentBlockType::Text => {
                        if let Some(t) = &block.text {
                            result.push_str(t);
                            result.push('\n');
                        }
                    }
                    ContentBlockType::ToolUse => {
                        if let Some(name) = &block.name {
                            result.push_str(&format!("[Tool: {}]\n", name));
                        }
                        if let Some(input) = &block.input {
                            result.push_str(&input.to_string());
                            result.push('\n');
                        }
                    }
                    ContentBlockType::ToolResult => {
                        if let Some(content) = &block.content {
                            result.push_str(content);
                            result.push('\n');
                        }
                    }
                }
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentBlock;

    fn tool_round(n: usize) -> Vec<Message> {
        let id = format!("call_{n}");
        vec![
            Message::with_blocks(
                Role::Assistant,
                vec![ContentBlock::tool_use(&id, "call_tool", serde_json::json!({}))],
            ),
            Message::with_blocks(
                Role::User,
                vec![ContentBlock::tool_result(&id, "ok", false)],
            ),
        ]
    }

    #[test]
    fn test_no_trim_when_within_window() {
        let mut msgs = vec![Message::user("a"), Message::assistant("b")];
        assert_eq!(trim_history(&mut msgs, 5), 0);
        assert_eq!(msgs.len(), 2);
    }

    #[test]
    fn test_zero_is_unlimited() {
        let mut msgs: Vec<Message> = (0..50).map(|i| Message::user(i.to_string())).collect();
        assert_eq!(trim_history(&mut msgs, 0), 0);
        assert_eq!(msgs.len(), 50);
    }

    #[test]
    fn test_trim_keeps_last_and_drops_leading_assistant() {
        let mut msgs = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
            Message::assistant("a2"),
            Message::user("q3"),
        ];
        // Last 4 starts with assistant a1, which is dropped.
        let removed = trim_history(&mut msgs, 4);
        assert_eq!(removed, 2);
        assert_eq!(msgs[0].text_content(), "q2");
        assert_eq!(msgs.len(), 3);
    }

    #[test]
    fn test_trim_skips_orphaned_tool_results() {
        let mut msgs = vec![Message::user("q1")];
        msgs.extend(tool_round(1));
        msgs.push(Message::assistant("a1"));
        msgs.push(Message::user("q2"));
        msgs.extend(tool_round(2));
        msgs.push(Message::assistant("a2"));
        msgs.push(Message::user("q3"));

        // Window of 7 starts on the tool result of round 1.
        trim_history(&mut msgs, 7);
        assert_eq!(msgs[0].text_content(), "q2");
        assert!(msgs.iter().all(|m| m.text_content() != "a1"));
        assert_eq!(msgs.last().unwrap().text_content(), "q3");
    }

    #[test]
    fn test_find_safe_start_index() {
        let mut msgs = tool_round(1);
        assert_eq!(find_safe_start_index(&msgs), 2);
        msgs.push(Message::user("next"));
        assert_eq!(find_safe_start_index(&msgs), 2);
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_text_tokens("12345678"), 2);
        assert_eq!(estimate_text_tokens(""), 0);
        let msgs = vec![Message::user("12345678"), Message::assistant("abcd")];
        assert_eq!(estimate_tokens(&msgs), 2 + 1 + 2 * MESSAGE_OVERHEAD_TOKENS);
    }

    #[test]
    fn test_get_message_text_blocks() {
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![
                ContentBlock::text("Looking it up."),
                ContentBlock::tool_use("c1", "call_tool", serde_json::json!({"a": 1})),
            ],
        );
        let text = get_message_text(&msg);
        assert!(text.contains("Looking it up."));
        assert!(text.contains("[Tool: call_tool]"));
    }
}
