// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connects to one MCP server over stdio, lists its tools and optionally
//! calls `get_file_contents`. Handy for checking a server outside the agent.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use mcpdemo::mcp::{McpClient, ServerConfig};
use mcpdemo::telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "debug-server", version, about = "Poke an MCP server over stdio")]
struct Args {
    /// Server command (default: the github-mcp binary next to this one)
    #[arg(long)]
    command: Option<String>,

    /// Arguments passed to the server command
    #[arg(long = "arg")]
    args: Vec<String>,

    /// Call get_file_contents on modelcontextprotocol/python-sdk LICENSE
    #[arg(long)]
    call: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn default_server_command() -> anyhow::Result<String> {
    let exe = std::env::current_exe().context("cannot locate current executable")?;
    let dir = exe.parent().map(PathBuf::from).unwrap_or_default();
    let name = format!("github-mcp{}", std::env::consts::EXE_SUFFIX);
    Ok(dir.join(name).to_string_lossy().into_owned())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let telemetry = if args.verbose {
        TelemetryConfig::development()
    } else {
        TelemetryConfig::default()
    };
    let _guard = init_telemetry(&telemetry).context("failed to initialize logging")?;

    let command = match args.command {
        Some(command) => command,
        None => default_server_command()?,
    };
    let mut env = BTreeMap::new();
    env.insert(
        "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
        "ENV_GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
    );
    let config = ServerConfig::stdio(command).with_args(args.args).with_env(env);

    let mut client = McpClient::new("debug", config);
    client.connect().await.context("failed to connect")?;

    if let Some(info) = client.server_info() {
        println!("Server: {} {}", info.name, info.version);
    }
    println!("{}", serde_json::to_string_pretty(client.tools())?);

    if args.call {
        let result = client
            .call_tool(
                "get_file_contents",
                serde_json::json!({
                    "owner": "modelcontextprotocol",
                    "repo": "python-sdk",
                    "path": "LICENSE",
                }),
            )
            .await
            .context("tool call failed")?;
        if result.is_error {
            println!("Tool error: {}", result.as_text());
        } else {
            println!("{}", result.as_text());
        }
    }

    client.disconnect().await;
    Ok(())
}
