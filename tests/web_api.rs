// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Browser API exercised in-process through the axum router.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mcpdemo::app::App;
use mcpdemo::config::ResolvedConfig;
use mcpdemo::mcp::ConnectionManager;
use mcpdemo::types::ProviderResponse;
use mcpdemo::ui;

use common::{dispatch, github_manager, GatedProvider, ScriptedProvider};

async fn router_with(manager: Arc<ConnectionManager>, responses: Vec<ProviderResponse>) -> Router {
    let app = App::assemble(
        manager,
        Box::new(ScriptedProvider::new(responses)),
        &ResolvedConfig::default(),
    )
    .await
    .unwrap();
    ui::router(app)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn chat_request(message: &str) -> Request<Body> {
    Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "message": message }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_index_and_health() {
    let router = router_with(Arc::new(ConnectionManager::new()), vec![]).await;

    let response = router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<title>MCP Demo</title>"));

    let response = router
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let router = router_with(github_manager().await, vec![]).await;

    let response = router
        .clone()
        .oneshot(Request::get("/api/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let tools: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(tools["github"].as_array().unwrap().len(), 2);

    let response = router
        .oneshot(Request::get("/api/resources").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let resources: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(resources["github"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_streams_sse_events() {
    let router = router_with(
        github_manager().await,
        vec![
            dispatch(
                "c1",
                "github",
                "list_repo_tree",
                serde_json::json!({"owner": "o", "repo": "r"}),
            ),
            ProviderResponse::text("The repo has a README."),
        ],
    )
    .await;

    let response = router.oneshot(chat_request("What is in o/r?")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let body = body_string(response).await;
    let tool_call = body.find("event: tool_call").unwrap();
    let tool_result = body.find("event: tool_result").unwrap();
    let done = body.find("event: done").unwrap();
    assert!(tool_call < tool_result && tool_result < done);
    assert!(body.contains("event: text"));
    assert!(body.contains(r#""text":"The repo has a README.""#));
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let router = router_with(Arc::new(ConnectionManager::new()), vec![]).await;
    let response = router.oneshot(chat_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_and_stats() {
    let router = router_with(
        Arc::new(ConnectionManager::new()),
        vec![ProviderResponse::text("hello")],
    )
    .await;

    let body = body_string(router.clone().oneshot(chat_request("hi")).await.unwrap()).await;
    assert!(body.contains("event: done"));

    let stats = router
        .clone()
        .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(stats).await).unwrap();
    assert_eq!(json["agent"]["messages"], 2);
    assert_eq!(json["busy"], false);

    let reset = router
        .clone()
        .oneshot(Request::post("/api/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::OK);

    let stats = router
        .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(stats).await).unwrap();
    assert_eq!(json["agent"]["messages"], 0);
}

#[tokio::test]
async fn test_second_turn_refused_while_one_runs() {
    let provider = GatedProvider::new();
    let release = provider.release.clone();
    let app = App::assemble(
        Arc::new(ConnectionManager::new()),
        Box::new(provider),
        &ResolvedConfig::default(),
    )
    .await
    .unwrap();
    let router = ui::router(app);

    // The handler takes the agent lock before it returns the stream.
    let first = router.clone().oneshot(chat_request("first")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router.clone().oneshot(chat_request("second")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let reset = router
        .clone()
        .oneshot(Request::post("/api/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::CONFLICT);

    let stats = router
        .clone()
        .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(stats).await).unwrap();
    assert_eq!(json["busy"], true);

    release.notify_one();
    let body = body_string(first).await;
    assert!(body.contains("event: done"));
    assert!(body.contains("finally"));

    let third = router.oneshot(chat_request("third")).await.unwrap();
    assert_eq!(third.status(), StatusCode::OK);
    release.notify_one();
    assert!(body_string(third).await.contains("event: done"));
}
