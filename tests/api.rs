//! Route-level tests over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ai_pixel_tracker::config::Config;
use ai_pixel_tracker::routes::{create_router, AppState};
use ai_pixel_tracker::store::MemoryEventStore;

fn test_app() -> Router {
    let config = Config {
        database_url: None,
        server_address: "0.0.0.0:0".to_string(),
        cors_origin: "*".to_string(),
        public_url: "http://localhost:3001".to_string(),
        retention_days: 90,
    };
    let state = AppState {
        store: Arc::new(MemoryEventStore::new()),
        public_url: config.public_url.clone(),
    };
    create_router(state, &config)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "Mozilla/5.0 GPTBot/1.0")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn page_view(url: &str) -> Value {
    json!({
        "trackingId": "site-1",
        "type": "page_view",
        "url": url,
        "sessionId": "s1"
    })
}

#[tokio::test]
async fn track_then_dashboard_roundtrip() {
    let app = test_app();

    for body in [
        page_view("/a"),
        page_view("/a"),
        json!({
            "trackingId": "site-1",
            "type": "ai_bot_detected",
            "url": "/a",
            "data": { "name": "GPTBot", "description": "OpenAI Training" }
        }),
    ] {
        let (status, value) = post_json(&app, "/api/track", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["success"], json!(true));
        assert!(value["eventId"].is_i64() || value["eventId"].is_u64());
    }

    let (status, value) = get(&app, "/api/analytics/dashboard/site-1?period=24h").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["period"], json!("24h"));
    assert!(value["dateRange"]["startDate"].is_string());

    let metrics = &value["metrics"];
    assert_eq!(metrics["totalEvents"], json!(3));
    assert_eq!(metrics["aiBotsDetected"], json!(1));
    assert_eq!(metrics["uniqueSessions"], json!(1));
    assert_eq!(metrics["topPages"][0]["url"], json!("/a"));
    assert_eq!(metrics["topPages"][0]["views"], json!(2));
    assert_eq!(metrics["topBots"][0]["name"], json!("GPTBot"));
    assert_eq!(metrics["topBots"][0]["count"], json!(1));
    assert_eq!(metrics["recentActivity"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn track_rejects_missing_required_fields() {
    let app = test_app();

    let (status, value) = post_json(&app, "/api/track", json!({ "type": "page_view" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value["error"],
        json!("Missing required fields: trackingId and type")
    );

    let (status, _) = post_json(&app, "/api/track", json!({ "trackingId": "site-1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_period_token_falls_back_to_seven_days() {
    let app = test_app();
    let (status, value) = get(&app, "/api/analytics/dashboard/site-1?period=fortnight").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["period"], json!("7d"));
}

#[tokio::test]
async fn batch_ingestion_and_validation() {
    let app = test_app();

    let (status, value) = post_json(
        &app,
        "/api/track/batch",
        json!({ "events": [page_view("/x"), page_view("/y")] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["processedCount"], json!(2));

    let (status, value) = get(&app, "/api/track/validate/site-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["valid"], json!(true));
    assert_eq!(value["eventCount"], json!(2));
    assert!(value["lastActivity"].is_string());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = test_app();
    let (status, value) = post_json(&app, "/api/track/batch", json!({ "events": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        value["error"],
        json!("Events array is required and must not be empty")
    );
}

#[tokio::test]
async fn validating_an_unknown_tracking_id_reports_no_activity() {
    let app = test_app();
    let (status, value) = get(&app, "/api/track/validate/ghost-site").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["valid"], json!(true));
    assert_eq!(value["eventCount"], json!(0));
    assert_eq!(value["lastActivity"], Value::Null);
}

#[tokio::test]
async fn realtime_endpoint_shape() {
    let app = test_app();
    post_json(&app, "/api/track", page_view("/live")).await;

    let (status, value) = get(&app, "/api/analytics/realtime/site-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["data"].as_array().unwrap().len(), 1);
    assert_eq!(value["data"][0]["type"], json!("page_view"));
    assert_eq!(value["data"][0]["sessionId"], json!("s1"));
    assert_eq!(value["summary"]["totalEventsLastHour"], json!(1));
    assert_eq!(value["summary"]["aiBotsDetectedLastHour"], json!(0));
    assert_eq!(value["summary"]["isActive"], json!(true));
}

#[tokio::test]
async fn trends_endpoint_buckets_by_requested_granularity() {
    let app = test_app();
    post_json(&app, "/api/track", page_view("/t")).await;

    let (status, value) = get(&app, "/api/analytics/trends/site-1?period=hourly&days=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["period"], json!("hourly"));
    let bucket = &value["trends"][0]["_id"];
    assert!(bucket["year"].is_i64() || bucket["year"].is_u64());
    assert!(bucket["hour"].is_i64() || bucket["hour"].is_u64());
    assert_eq!(value["trends"][0]["totalEvents"], json!(1));
    assert_eq!(value["trends"][0]["pageViews"], json!(1));

    // Unrecognized granularity falls back to daily buckets, which carry no
    // hour component at all.
    let (_, value) = get(&app, "/api/analytics/trends/site-1?period=weekly").await;
    assert_eq!(value["period"], json!("daily"));
    assert!(value["trends"][0]["_id"].get("hour").is_none());
}

#[tokio::test]
async fn tracker_snippet_is_served_with_the_bot_table() {
    let app = test_app();
    let request = Request::builder()
        .uri("/client/ai-pixel-tracker.js")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/javascript"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let script = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(script.contains("GPTBot"));
    assert!(script.contains("data-tracking-id"));
    assert!(script.contains("http://localhost:3001/api/track"));
}
