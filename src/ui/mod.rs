// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Front ends: the console REPL and the browser chat.

pub mod console;
pub mod web;

pub use console::{format_resources, format_tools, run_query, run_repl};
pub use web::{router, serve};
