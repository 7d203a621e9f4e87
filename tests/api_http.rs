// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /submit (accepted, 429 with Retry-After, 400 on invalid intake)
// - POST /credibility, GET /credibility/source
// - GET /rate-limit/{identity}, GET /xp/{identity}, GET /leaderboard

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use kleo_rewards::api::{self, AppState};
use kleo_rewards::clock::ManualClock;
use kleo_rewards::config::KleoConfig;
use kleo_rewards::credibility::SourceTable;
use kleo_rewards::fetch::DisabledFetcher;
use kleo_rewards::storage::MemoryStorage;
use kleo_rewards::SubmissionService;

const BODY_LIMIT: usize = 1024 * 1024;

/// Router over an in-memory service with a controllable clock.
fn test_router() -> (Router, ManualClock) {
    let clock = ManualClock::at_epoch_2025();
    let cfg = KleoConfig::default();
    let svc = SubmissionService::new(
        &cfg,
        SourceTable::default_seed(),
        MemoryStorage::shared(),
        Arc::new(clock.clone()),
        Arc::new(DisabledFetcher),
    );
    (api::router(AppState::new(svc, &cfg)), clock)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json, Option<String>) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let retry_after = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v, retry_after)
}

fn post_json(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (app, _) = test_router();
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn api_submit_then_rate_limited() {
    let (app, clock) = test_router();
    let payload = json!({
        "identity_key": "0xABC",
        "content_type": "story",
        "media_type": "video",
        "text": "Street fair on Main",
        "lat": 40.7,
        "lng": -74.0
    });

    let (status, v, _) = send(&app, post_json("/submit", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["points"], 6);
    assert_eq!(v["xp"]["total_xp"], 6);
    assert_eq!(v["xp"]["post_count"], 1);
    assert_eq!(v["level"]["level"], 1);

    clock.advance_ms(100_500);
    let (status, v, retry_after) = send(&app, post_json("/submit", payload)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(v["error"], "rate_limited");
    assert_eq!(v["time_remaining_ms"], 199_500);
    assert_eq!(v["retry_in"], "3:20");
    assert_eq!(retry_after.as_deref(), Some("200"));

    let (status, v, _) = send(&app, get("/xp/0xABC")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total_xp"], 6, "denied attempt earns nothing");
    assert_eq!(v["progress"]["next_level_xp"], 50);
}

#[tokio::test]
async fn api_submit_news_without_url_is_400() {
    let (app, _) = test_router();
    let payload = json!({
        "identity_key": "0xABC",
        "content_type": "news",
        "lat": 0.0,
        "lng": 0.0
    });
    let (status, v, _) = send(&app, post_json("/submit", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap_or_default().contains("url"));

    let (_, v, _) = send(&app, get("/rate-limit/0xABC")).await;
    assert_eq!(v["allowed"], true, "rejected intake leaves the cooldown untouched");
}

#[tokio::test]
async fn api_credibility_endpoints() {
    let (app, _) = test_router();

    let (status, v, _) = send(
        &app,
        post_json(
            "/credibility",
            json!({
                "url": "https://apnews.com/article/x",
                "title": "Council passes budget",
                "content": "By Sam Lee. The council approved $12 million on 2024-06-01, officials said."
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["is_reliable"], true);
    assert_eq!(v["source_credibility"], "high");
    assert!(v["reasons"].as_array().is_some_and(|r| !r.is_empty()));

    let (status, v, _) = send(
        &app,
        get("/credibility/source?url=https%3A%2F%2Fwww.infowars.com%2Fa"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["credibility"], "low");
    assert_eq!(v["category"], "conspiracy");
    assert_eq!(v["rating"], 10);
    assert_eq!(v["known_unreliable"], true);
}

#[tokio::test]
async fn api_rate_limit_status_and_leaderboard() {
    let (app, _) = test_router();

    let (_, v, _) = send(&app, get("/rate-limit/nobody")).await;
    assert_eq!(v["allowed"], true);
    assert_eq!(v["formatted"], "0:00");

    for id in ["a", "b"] {
        let media = if id == "b" { "video" } else { "text" };
        let payload = json!({
            "identity_key": id,
            "content_type": "story",
            "media_type": media,
            "lat": 0.0,
            "lng": 0.0
        });
        let (status, _, _) = send(&app, post_json("/submit", payload)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, v, _) = send(&app, get("/rate-limit/a")).await;
    assert_eq!(v["allowed"], false);
    assert_eq!(v["formatted"], "5:00");

    let (status, v, _) = send(&app, get("/leaderboard?top=5")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = v.as_array().expect("leaderboard array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["identity_key"], "b");
    assert_eq!(rows[0]["total_xp"], 6);
    assert_eq!(rows[1]["identity_key"], "a");
}
