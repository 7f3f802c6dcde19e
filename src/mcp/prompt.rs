// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! System prompt describing the connected MCP servers.

use std::fmt::Write;

use super::types::{ResourceCatalog, ToolCatalog};
use crate::config::ToolMode;

const PREAMBLE: &str = "You are a helpful assistant with access to tools provided by \
Model Context Protocol (MCP) servers. Use them to answer the user's questions.";

/// Render the prompt for the `call_tool` dispatcher.
pub fn build_system_prompt(tools: &ToolCatalog, resources: &ResourceCatalog) -> String {
    build_system_prompt_for(ToolMode::Dispatcher, tools, resources, None)
}

/// Render the prompt for a tool mode, with optional user additions appended.
pub fn build_system_prompt_for(
    mode: ToolMode,
    tools: &ToolCatalog,
    resources: &ResourceCatalog,
    additions: Option<&str>,
) -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n\n");

    match mode {
        ToolMode::Dispatcher => prompt.push_str(
            "To use a tool, call the `call_tool` function with `server_name` set to the \
server, `tool_name` set to the tool, and `arguments` set to a JSON object that \
matches the tool's input schema.\n",
        ),
        ToolMode::Native => prompt.push_str(
            "Each tool is available as a function named `mcp__<server>__<tool>`.\n",
        ),
    }

    if tools.is_empty() && resources.is_empty() {
        prompt.push_str("\nNo MCP servers are connected.\n");
    }

    for (server, server_tools) in tools {
        let _ = writeln!(prompt, "\n## Server: {}\n", server);
        if server_tools.is_empty() {
            prompt.push_str("This server exposes no tools.\n");
        }
        for tool in server_tools {
            let _ = writeln!(prompt, "### {}", tool.name);
            if let Some(desc) = &tool.description {
                let _ = writeln!(prompt, "{}", desc.trim());
            }
            let _ = writeln!(prompt, "Input schema: {}\n", tool.input_schema);
        }

        if let Some(server_resources) = resources.get(server) {
            write_resources(&mut prompt, server_resources);
        }
    }

    // Servers that expose resources but did not appear in the tool catalog.
    for (server, server_resources) in resources {
        if !tools.contains_key(server) {
            let _ = writeln!(prompt, "\n## Server: {}\n", server);
            write_resources(&mut prompt, server_resources);
        }
    }

    if let Some(additions) = additions.map(str::trim).filter(|a| !a.is_empty()) {
        prompt.push_str("\n");
        prompt.push_str(additions);
        prompt.push('\n');
    }

    prompt
}

fn write_resources(prompt: &mut String, resources: &[super::types::McpResourceInfo]) {
    if resources.is_empty() {
        return;
    }
    prompt.push_str("Resources:\n");
    for r in resources {
        let _ = write!(prompt, "- {} ({})", r.uri, r.name);
        if let Some(mime) = &r.mime_type {
            let _ = write!(prompt, " [{}]", mime);
        }
        if let Some(desc) = &r.description {
            let _ = write!(prompt, ": {}", desc);
        }
        prompt.push('\n');
    }
}
