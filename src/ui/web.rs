// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Browser front end.
//!
//! A single embedded page talks to a small JSON API. Chat replies stream back
//! as Server-Sent Events named after [`PumpEvent`] kinds.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio::sync::{watch, Mutex};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::app::{stream_turn, App};
use crate::mcp::{ConnectionManager, ResourceCatalog, ToolCatalog};
use crate::streaming::{sse_event, StreamPump};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

const INDEX_HTML: &str = include_str!("static/index.html");

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Clone)]
struct WebState {
    agent: Arc<Mutex<Agent>>,
    manager: Arc<ConnectionManager>,
    tools: Arc<ToolCatalog>,
    resources: Arc<ResourceCatalog>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn busy() -> Response {
    error_response(StatusCode::CONFLICT, "a chat turn is already running")
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn handle_chat(State(state): State<WebState>, Json(body): Json<ChatRequest>) -> Response {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    // One turn at a time; the guard moves into the task below.
    let Ok(mut agent) = state.agent.clone().try_lock_owned() else {
        return busy();
    };

    let pump = StreamPump::new();
    let tx = pump.sender();
    tokio::spawn(async move {
        {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            let turn = stream_turn(&mut *agent, &message, &tx, Some(cancel_rx));
            tokio::pin!(turn);
            tokio::select! {
                _ = &mut turn => {}
                _ = tx.closed() => {
                    debug!("browser disconnected, cancelling turn");
                    let _ = cancel_tx.send(true);
                    let _ = (&mut turn).await;
                }
            }
        }
        // Unlock before the stream ends so the next request is not refused.
        drop(agent);
        drop(tx);
    });

    let stream = pump
        .into_stream()
        .map(|event| Ok::<_, Infallible>(sse_event(&event)));
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_reset(State(state): State<WebState>) -> Response {
    match state.agent.try_lock() {
        Ok(mut agent) => {
            agent.clear_history();
            Json(serde_json::json!({ "ok": true })).into_response()
        }
        Err(_) => busy(),
    }
}

async fn handle_tools(State(state): State<WebState>) -> Json<ToolCatalog> {
    Json((*state.tools).clone())
}

async fn handle_resources(State(state): State<WebState>) -> Json<ResourceCatalog> {
    Json((*state.resources).clone())
}

async fn handle_stats(State(state): State<WebState>) -> Response {
    // Reading stats must not wait behind a running turn.
    let agent = state.agent.try_lock().ok().map(|a| a.stats());
    let busy = agent.is_none();
    #[cfg(feature = "telemetry")]
    let metrics = Some(GLOBAL_METRICS.snapshot());
    #[cfg(not(feature = "telemetry"))]
    let metrics: Option<()> = None;
    Json(serde_json::json!({
        "agent": agent,
        "busy": busy,
        "metrics": metrics,
    }))
    .into_response()
}

async fn handle_healthz(State(state): State<WebState>) -> Response {
    let servers: serde_json::Map<String, serde_json::Value> = state
        .manager
        .connection_states()
        .await
        .into_iter()
        .map(|(name, (conn, err))| {
            (
                name,
                serde_json::json!({ "state": conn.to_string(), "error": err }),
            )
        })
        .collect();
    Json(serde_json::json!({ "status": "ok", "servers": servers })).into_response()
}

/// Build the router over an assembled app.
pub fn router(app: App) -> Router {
    let state = WebState {
        agent: Arc::new(Mutex::new(app.agent)),
        manager: app.manager,
        tools: Arc::new(app.tools),
        resources: Arc::new(app.resources),
    };

    Router::new()
        .route("/", get(handle_index))
        .route("/api/chat", post(handle_chat))
        .route("/api/reset", post(handle_reset))
        .route("/api/tools", get(handle_tools))
        .route("/api/resources", get(handle_resources))
        .route("/api/stats", get(handle_stats))
        .route("/healthz", get(handle_healthz))
        .with_state(state)
}

/// Serve the browser UI until Ctrl-C, then disconnect the MCP servers.
pub async fn serve(app: App, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", bind))?;
    let manager = app.manager.clone();
    let router = router(app);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Web UI listening on http://{}", addr);
    println!("Open http://{} in your browser (Ctrl-C to stop)", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down web UI");
        })
        .await
        .context("web server failed")?;

    manager.disconnect_all().await;
    Ok(())
}
