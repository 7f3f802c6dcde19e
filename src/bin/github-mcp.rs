// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Serves the `github` MCP server on stdio.
//!
//! Environment: `GITHUB_PERSONAL_ACCESS_TOKEN`, optionally `GITHUB_API_URL`.

use anyhow::Context;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

use mcpdemo::github::GithubServer;
use mcpdemo::telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    // stdout carries the protocol; logs go to stderr.
    let _guard = init_telemetry(&TelemetryConfig::production())
        .context("failed to initialize logging")?;
    tracing::info!("GitHub server started.");

    let service = GithubServer::from_env()
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;
    Ok(())
}
