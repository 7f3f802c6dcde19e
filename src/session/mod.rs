// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory conversation windowing.
//!
//! Conversations live only as long as the process. The agent trims its
//! history before each model call so the request stays within a bounded
//! number of messages.

pub mod context;

pub use context::{
    estimate_message_tokens, estimate_text_tokens, estimate_tokens, find_safe_start_index,
    get_message_text, trim_history,
};
