//! Integration tests for the jukebox-ap HTTP API
//!
//! Requests go through the full router with `oneshot`; the engine behind it
//! is wired to the test doubles.

mod helpers;

use axum::body::Body;
use axum::http::StatusCode;
use helpers::{wait_until, ScriptedResolver, TestHarness};
use http::{Method, Request};
use http_body_util::BodyExt;
use jukebox_ap::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_server() -> (axum::Router, TestHarness) {
    let harness = TestHarness::start().await;
    let router = create_router(AppState::new(Arc::clone(&harness.engine), 3000));
    (router, harness)
}

/// Helper function to make HTTP requests to the test server
async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let request = Request::builder().method(method).uri(path);
    let request = match body {
        Some(json_body) => request
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    let json_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };
    (status, json_body)
}

async fn wait_for_queue_len(app: &axum::Router, len: usize) {
    wait_until(|| {
        let app = app.clone();
        async move {
            let (_, body) = make_request(&app, Method::GET, "/status", None).await;
            body.map_or(false, |b| b["queue"].as_array().map_or(0, Vec::len) == len)
        }
    })
    .await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _h) = setup_test_server().await;

    let (status, body) = make_request(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let body = body.expect("Expected response body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "jukebox-ap");
    assert_eq!(body["port"], 3000);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_initial_status() {
    let (app, _h) = setup_test_server().await;

    let (status, body) = make_request(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["playing"], false);
    assert_eq!(body["paused"], false);
    assert_eq!(body["currentSong"], "");
    assert_eq!(body["volume"], 100);
    assert_eq!(body["currentQueueIndex"], -1);
    assert_eq!(body["queue"], json!([]));
}

#[tokio::test]
async fn test_add_answers_before_resolution() {
    let (app, h) = setup_test_server().await;
    let gate = h.resolver.gate("https://example.com/a");

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/queue/add",
        Some(json!({ "url": "https://example.com/a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true, "message": "Added to queue" }));

    wait_for_queue_len(&app, 1).await;
    gate.notify_one();
    h.wait_for_launches(1).await;

    let (_, body) = make_request(&app, Method::GET, "/status", None).await;
    let body = body.unwrap();
    assert_eq!(body["queue"][0]["url"], "https://example.com/a");
    assert_eq!(body["queue"][0]["title"], ScriptedResolver::title_for("https://example.com/a"));
    assert_eq!(body["currentQueueIndex"], 0);
}

#[tokio::test]
async fn test_add_requires_url() {
    let (app, _h) = setup_test_server().await;

    let (status, body) = make_request(&app, Method::POST, "/queue/add", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].as_str().unwrap().contains("URL required"));

    let (status, _) =
        make_request(&app, Method::POST, "/queue/add", Some(json!({ "url": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_returns_queue() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A", "B"]).await;
    let b = h.engine.status().await.queue[1].id;

    let (status, body) =
        make_request(&app, Method::POST, "/queue/remove", Some(json!({ "id": b }))).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["queue"].as_array().unwrap().len(), 1);
    assert_eq!(body["queue"][0]["url"], "A");
}

#[tokio::test]
async fn test_remove_unknown_is_not_found() {
    let (app, _h) = setup_test_server().await;

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/queue/remove",
        Some(json!({ "id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_play_index_validation() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A", "B"]).await;

    for index in [-1, 2] {
        let (status, _) =
            make_request(&app, Method::POST, "/queue/play", Some(json!({ "index": index }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) =
        make_request(&app, Method::POST, "/queue/play", Some(json!({ "index": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true, "outcome": "playing" }));
    assert_eq!(h.current_index().await, 1);
}

#[tokio::test]
async fn test_next_previous_clear() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A", "B"]).await;

    let (status, _) = make_request(&app, Method::POST, "/queue/next", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.current_index().await, 1);

    let (status, _) = make_request(&app, Method::POST, "/queue/previous", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.current_index().await, 0);

    let (status, body) = make_request(&app, Method::POST, "/queue/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true }));
    assert!(h.engine.status().await.queue.is_empty());
    assert_eq!(h.launcher.live(), 0);
}

#[tokio::test]
async fn test_volume_endpoint() {
    let (app, h) = setup_test_server().await;

    let (status, body) =
        make_request(&app, Method::POST, "/volume", Some(json!({ "volume": 150 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].is_string());

    let (status, body) =
        make_request(&app, Method::POST, "/volume", Some(json!({ "volume": 30 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true, "volume": 30 }));
    assert_eq!(h.engine.status().await.volume, 30);
}

#[tokio::test]
async fn test_volume_accepts_numeric_string() {
    let (app, h) = setup_test_server().await;

    let (status, body) =
        make_request(&app, Method::POST, "/volume", Some(json!({ "volume": "50" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true, "volume": 50 }));
    assert_eq!(h.engine.status().await.volume, 50);

    let (status, body) =
        make_request(&app, Method::POST, "/volume", Some(json!({ "volume": "loud" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].is_string());
    assert_eq!(h.engine.status().await.volume, 50);
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let (app, _h) = setup_test_server().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/queue/play")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));

    let (status, body) = make_request(&app, Method::POST, "/queue/remove", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_pause_and_stop() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A"]).await;

    let (status, body) = make_request(&app, Method::POST, "/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap(), json!({ "success": true, "paused": true }));

    let (status, _) = make_request(&app, Method::POST, "/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = h.engine.status().await;
    assert!(!snapshot.playing);
    assert!(!snapshot.paused);
    assert_eq!(snapshot.current_queue_index, -1);
}

#[tokio::test]
async fn test_control_failure_maps_to_service_unavailable() {
    let (app, h) = setup_test_server().await;
    h.control.set_unreachable(true);

    let (status, body) = make_request(&app, Method::POST, "/pause", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.unwrap()["error"].is_string());

    let (status, _) = make_request(
        &app,
        Method::POST,
        "/seek",
        Some(json!({ "position": 10, "relative": true })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_seek_defaults_to_absolute() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A"]).await;

    let (status, _) =
        make_request(&app, Method::POST, "/seek", Some(json!({ "position": 30 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h
        .control
        .commands()
        .contains(&vec![json!("seek"), json!(30.0), json!("absolute")]));
}

#[tokio::test]
async fn test_event_stream_starts_with_init() {
    let (app, h) = setup_test_server().await;
    h.enqueue_all(&["A"]).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/events")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = tokio::time::timeout(helpers::WAIT, body.frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();

    assert!(text.starts_with("event: init\n"), "{}", text);
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    let init: Value = serde_json::from_str(data).unwrap();
    assert_eq!(init["type"], "init");
    assert_eq!(init["currentQueueIndex"], 0);
    assert_eq!(init["playing"], true);
}
