// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! mcpdemo entry point: CLI, commands and REPL.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;

use mcpdemo::app::{connect_servers, App};
use mcpdemo::config::{self, CliOptions, ResolvedConfig, ToolMode};
use mcpdemo::mcp::McpConfig;
use mcpdemo::providers::create_provider;
use mcpdemo::telemetry::{init_telemetry, TelemetryConfig};
use mcpdemo::ui;

/// Chat with a model that can use MCP tool servers.
#[derive(Parser)]
#[command(name = "mcpdemo")]
#[command(author, version, about = "Chat with a model that can use MCP tool servers", long_about = None)]
struct Cli {
    /// Run one query (after listing every server's tools and resources) and exit
    #[arg(short, long)]
    query: Option<String>,

    /// MCP servers file (Claude Desktop format)
    #[arg(long, env = "MCP_CONFIG_PATH", global = true)]
    mcp_config: Option<String>,

    /// Model to use
    #[arg(short, long, env = "MCPDEMO_MODEL", global = true)]
    model: Option<String>,

    /// OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", global = true)]
    base_url: Option<String>,

    /// How MCP tools are offered to the model
    #[arg(long, value_parser = parse_tool_mode, global = true)]
    tool_mode: Option<ToolMode>,

    /// Conversation items kept per turn (0 keeps everything)
    #[arg(long = "history", global = true)]
    history_window: Option<usize>,

    /// Show tool calls and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (the default)
    Chat,

    /// Serve the browser chat UI
    Web {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
    },

    /// List tools from every configured server
    Tools {
        #[arg(long)]
        json: bool,
    },

    /// List resources from every configured server
    Resources {
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,

    /// Show version information
    Version,
}

fn parse_tool_mode(s: &str) -> Result<ToolMode, String> {
    s.parse::<ToolMode>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let telemetry = if cli.verbose {
        TelemetryConfig::development()
    } else {
        TelemetryConfig::default()
    };
    let _guard = init_telemetry(&telemetry).context("failed to initialize logging")?;

    let cli_options = CliOptions {
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
        mcp_config: cli.mcp_config.clone(),
        tool_mode: cli.tool_mode,
        history_window: cli.history_window,
        web_bind: match &cli.command {
            Some(Commands::Web { bind }) => bind.clone(),
            _ => None,
        },
    };
    let workspace_root = std::env::current_dir()?;
    let config = config::load_config(&workspace_root, cli_options)?;

    match cli.command {
        Some(Commands::Version) => {
            println!("mcpdemo {}", mcpdemo::VERSION);
            Ok(())
        }
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::Tools { json }) => list_catalogs(&config, json, true).await,
        Some(Commands::Resources { json }) => list_catalogs(&config, json, false).await,
        Some(Commands::Web { .. }) => {
            let app = start_app(&config).await?;
            ui::serve(app, &config.web_bind).await
        }
        Some(Commands::Chat) | None => {
            let mut app = start_app(&config).await?;
            let result = match &cli.query {
                Some(query) => ui::run_query(&mut app, query, cli.verbose).await.map(|_| ()),
                None => ui::run_repl(&mut app, cli.verbose).await,
            };
            app.shutdown().await;
            result
        }
    }
}

fn load_servers(config: &ResolvedConfig) -> anyhow::Result<McpConfig> {
    let path = PathBuf::from(&config.mcp_config);
    McpConfig::load_from_file(&path)
        .with_context(|| format!("could not load MCP servers from {}", path.display()))
}

/// Check the API key before any server is spawned, then connect everything.
async fn start_app(config: &ResolvedConfig) -> anyhow::Result<App> {
    let provider = match create_provider(config.provider_config()) {
        Ok(provider) => provider,
        Err(e) if e.is_auth_error() => {
            eprintln!("{}", "Please configure your API key in the project.".red());
            std::process::exit(1);
        }
        Err(e) => bail!("failed to create provider: {}", e),
    };
    let servers = load_servers(config)?;
    App::start(config, &servers, provider).await
}

async fn list_catalogs(config: &ResolvedConfig, json: bool, tools: bool) -> anyhow::Result<()> {
    let servers = load_servers(config)?;
    let manager = connect_servers(&servers).await;

    let output = if tools {
        let catalog = manager.list_all_tools().await;
        if json {
            serde_json::to_string_pretty(&catalog)?
        } else {
            ui::format_tools(&catalog)
        }
    } else {
        let catalog = manager.list_all_resources().await;
        if json {
            serde_json::to_string_pretty(&catalog)?
        } else {
            ui::format_resources(&catalog)
        }
    };
    println!("{}", output.trim_end());

    for (name, (state, error)) in manager.connection_states().await {
        if let Some(error) = error {
            eprintln!("{} {} ({}): {}", "!".yellow(), name, state, error);
        }
    }
    manager.disconnect_all().await;
    Ok(())
}
