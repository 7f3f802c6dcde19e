// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Console front end: single-shot queries and the interactive REPL.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use tokio::sync::watch;
use tracing::warn;

use crate::agent::Agent;
use crate::app::{stream_turn, App};
use crate::mcp::{ResourceCatalog, ToolCatalog};
use crate::session::get_message_text;
use crate::streaming::{ConsoleSink, StreamPump};
use crate::types::Role;

const HELP: &str = "\
Commands:
  /help       Show this help
  /tools      List tools from every connected server
  /resources  List resources from every connected server
  /clear      Forget the conversation so far
  /history    Show the conversation kept for the next turn
  /stats      Show token and tool usage
  /exit       Quit (Ctrl-D also works)

Ctrl-C cancels the running turn.";

/// Render the tool catalog, one block per server.
pub fn format_tools(tools: &ToolCatalog) -> String {
    if tools.is_empty() {
        return "No tools available.\n".to_string();
    }
    let mut out = String::new();
    for (server, server_tools) in tools {
        let _ = writeln!(out, "{} ({} tools)", server.bold(), server_tools.len());
        for tool in server_tools {
            match &tool.description {
                Some(desc) => {
                    let _ = writeln!(out, "  {}  {}", tool.name.cyan(), first_line(desc).dimmed());
                }
                None => {
                    let _ = writeln!(out, "  {}", tool.name.cyan());
                }
            }
        }
    }
    out
}

/// Render the resource catalog, one block per server.
pub fn format_resources(resources: &ResourceCatalog) -> String {
    let total: usize = resources.values().map(Vec::len).sum();
    if total == 0 {
        return "No resources available.\n".to_string();
    }
    let mut out = String::new();
    for (server, server_resources) in resources {
        if server_resources.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{} ({} resources)", server.bold(), server_resources.len());
        for res in server_resources {
            let _ = write!(out, "  {}  {}", res.uri.cyan(), res.name);
            if let Some(mime) = &res.mime_type {
                let _ = write!(out, " [{}]", mime);
            }
            out.push('\n');
        }
    }
    out
}

fn first_line(text: &str) -> &str {
    text.trim().lines().next().unwrap_or_default()
}

/// List every server's tools and resources, run one streaming turn and
/// return the answer.
pub async fn run_query(app: &mut App, query: &str, show_tools: bool) -> Result<String> {
    print!("{}", format_tools(&app.tools));
    print!("{}", format_resources(&app.resources));
    println!();
    run_turn(&mut app.agent, query, show_tools).await
}

/// Stream one turn to stdout. Ctrl-C cancels it.
async fn run_turn(agent: &mut Agent, input: &str, show_tools: bool) -> Result<String> {
    let mut pump = StreamPump::new();
    let tx = pump.sender();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let mut sink = ConsoleSink::stdout(show_tools);
    let render = async {
        while let Some(event) = pump.next().await {
            if let Err(e) = sink.handle(&event) {
                warn!("stdout write failed: {}", e);
            }
            if event.is_terminal() {
                break;
            }
        }
    };

    let (result, ()) = tokio::join!(stream_turn(agent, input, &tx, Some(cancel_rx)), render);
    ctrl_c.abort();
    result
}

/// Interactive loop on top of `rustyline`.
pub async fn run_repl(app: &mut App, show_tools: bool) -> Result<()> {
    let mut editor = rustyline::DefaultEditor::new()?;
    let history_path = history_file_path();
    if let Some(ref path) = history_path {
        let _ = editor.load_history(path);
    }

    println!(
        "{} {} via {} ({})",
        "mcpdemo".bold(),
        crate::VERSION,
        app.agent.provider_name(),
        app.agent.model()
    );
    let tool_count: usize = app.tools.values().map(Vec::len).sum();
    println!(
        "{}",
        format!(
            "{} servers, {} tools. Type /help for commands.",
            app.tools.len(),
            tool_count
        )
        .dimmed()
    );

    loop {
        let line = match editor.readline(&format!("{} ", ">".green())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        if let Some(command) = line.strip_prefix('/') {
            match handle_command(app, command) {
                CommandOutcome::Continue => continue,
                CommandOutcome::Exit => break,
            }
        }

        if let Err(e) = run_turn(&mut app.agent, line, show_tools).await {
            // Already rendered by the sink.
            tracing::debug!("turn failed: {:#}", e);
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.save_history(path);
    }
    Ok(())
}

enum CommandOutcome {
    Continue,
    Exit,
}

fn handle_command(app: &mut App, command: &str) -> CommandOutcome {
    match command.split_whitespace().next().unwrap_or_default() {
        "help" | "?" => println!("{}", HELP),
        "tools" => print!("{}", format_tools(&app.tools)),
        "resources" => print!("{}", format_resources(&app.resources)),
        "clear" | "reset" => {
            app.agent.clear_history();
            println!("{}", "Conversation cleared.".dimmed());
        }
        "history" => print!("{}", format_history(&app.agent)),
        "stats" => print!("{}", format_stats(&app.agent)),
        "exit" | "quit" | "q" => return CommandOutcome::Exit,
        other => println!("Unknown command: /{}. Type /help for commands.", other),
    }
    CommandOutcome::Continue
}

fn format_history(agent: &Agent) -> String {
    let history = agent.history();
    if history.is_empty() {
        return "History is empty.\n".to_string();
    }
    let mut out = String::new();
    for message in history {
        let role = match message.role {
            Role::User => format!("{:>9}", "user").green(),
            Role::Assistant => format!("{:>9}", "assistant").cyan(),
            Role::System => format!("{:>9}", "system").yellow(),
        };
        let text = get_message_text(message);
        let text = if text.chars().count() > 120 {
            format!("{}...", text.chars().take(120).collect::<String>())
        } else {
            text
        };
        let _ = writeln!(out, "{}: {}", role, text.replace('\n', " "));
    }
    out
}

fn format_stats(agent: &Agent) -> String {
    let stats = agent.stats();
    let mut out = format!(
        "Session: {} turns, {} messages (~{} tokens), {} tool calls ({} failed)\n",
        stats.turns,
        stats.messages,
        stats.estimated_tokens,
        stats.tool_calls,
        stats.tool_errors
    );
    #[cfg(feature = "telemetry")]
    out.push_str(
        &crate::telemetry::metrics::GLOBAL_METRICS
            .snapshot()
            .format_report(),
    );
    out
}

fn history_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".mcpdemo").join("history"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{McpResourceInfo, McpToolInfo};

    fn tool(name: &str, desc: Option<&str>) -> McpToolInfo {
        McpToolInfo {
            name: name.to_string(),
            description: desc.map(str::to_string),
            input_schema: serde_json::json!({"type": "object"}),
            server: "github".to_string(),
            destructive: false,
            read_only: true,
            idempotent: true,
        }
    }

    #[test]
    fn test_format_tools() {
        colored::control::set_override(false);
        let mut tools = ToolCatalog::new();
        tools.insert(
            "github".to_string(),
            vec![
                tool("get_file_contents", Some("Retrieve the file contents\nof a file")),
                tool("list_repo_tree", None),
            ],
        );
        let out = format_tools(&tools);
        assert!(out.contains("github (2 tools)"));
        assert!(out.contains("get_file_contents  Retrieve the file contents\n"));
        assert!(out.contains("  list_repo_tree\n"));
        assert_eq!(format_tools(&ToolCatalog::new()), "No tools available.\n");
    }

    #[test]
    fn test_format_resources_skips_empty_servers() {
        colored::control::set_override(false);
        let mut resources = ResourceCatalog::new();
        resources.insert("github".to_string(), vec![]);
        assert_eq!(format_resources(&resources), "No resources available.\n");

        resources.insert(
            "docs".to_string(),
            vec![McpResourceInfo {
                uri: "file:///readme.md".to_string(),
                name: "readme".to_string(),
                description: None,
                mime_type: Some("text/markdown".to_string()),
                server: "docs".to_string(),
            }],
        );
        let out = format_resources(&resources);
        assert!(out.contains("file:///readme.md  readme [text/markdown]"));
        assert!(!out.contains("github"));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("  one\ntwo"), "one");
        assert_eq!(first_line(""), "");
    }
}
