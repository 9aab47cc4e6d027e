//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use revu_config::ScrapeConfig;
use revu_coordination::{InMemoryStore, KeyLayout, LocalTaskQueue, ManualClock};
use revu_interfaces::TaskQueue;
use revu_orchestration::ScrapeOrchestrator;
use revu_rest_api::{create_rest_app, AppConfig, AppContext};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const PRODUCT_URL: &str = "https://www.amazon.com/dp/B07XJ8C8F5";

struct TestApp {
    router: Router,
    queue: Arc<LocalTaskQueue>,
}

fn test_app(daily_limit: i64) -> TestApp {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()));
    let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
    let queue = Arc::new(LocalTaskQueue::new());
    let config = ScrapeConfig {
        daily_limit,
        ..Default::default()
    };
    let orchestrator = ScrapeOrchestrator::new(store, queue.clone(), clock, KeyLayout::default(), &config);

    TestApp {
        router: create_rest_app(AppContext::new(Arc::new(orchestrator)), AppConfig::default()),
        queue,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn start(user: &str, url: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/start-scrape")
        .header("content-type", "application/json")
        .header("x-user-id", user)
        .body(Body::from(json!({ "url": url }).to_string()))
        .unwrap()
}

fn get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let app = test_app(3);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_second_start_conflicts_and_lock_shows_owner() {
    let app = test_app(3);

    let (status, body) = send(&app.router, start("u1", PRODUCT_URL)).await;
    assert_eq!(status, StatusCode::OK);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, start("u2", PRODUCT_URL)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["status"], 409);
    assert_eq!(body["error"]["code"], "SCRAPE_IN_PROGRESS");

    let (status, body) = send(&app.router, get("/scrape-lock-status", "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locked"], true);
    assert_eq!(body["owner_job_id"], job_id.as_str());
    assert!(body["ttl"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = test_app(1);

    let (status, body) = send(&app.router, start("u1", PRODUCT_URL)).await;
    assert_eq!(status, StatusCode::OK);
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app.router, post(&format!("/cancel-scrape/{}", job_id), "u1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, start("u1", PRODUCT_URL)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_status_and_cancel_of_queued_job() {
    let app = test_app(3);

    let (_, body) = send(&app.router, start("u1", PRODUCT_URL)).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, get(&format!("/scrape-status/{}", job_id), "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job_id"], job_id.as_str());
    assert_eq!(body["state"], "PENDING");
    assert_eq!(body["progress"], 0);
    assert!(body.get("result").is_none());

    let (status, body) = send(&app.router, post(&format!("/cancel-scrape/{}", job_id), "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "job_id": job_id, "cancel_requested": true }));

    let (_, body) = send(&app.router, get(&format!("/scrape-status/{}", job_id), "u1")).await;
    assert_eq!(body["state"], "REVOKED");

    let (_, body) = send(&app.router, get("/scrape-lock-status", "u1")).await;
    assert_eq!(body, json!({ "locked": false }));

    // The worker never sees a revoked job
    assert!(app.queue.dequeue(Duration::from_millis(10)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_job_reads_unknown() {
    let app = test_app(3);
    let (status, body) = send(&app.router, get("/scrape-status/no-such-job", "u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "UNKNOWN");
    assert_eq!(body["progress"], 0);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = test_app(3);
    let request = Request::builder()
        .method("POST")
        .uri("/start-scrape")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "url": PRODUCT_URL }).to_string()))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["status"], 401);
}

#[tokio::test]
async fn test_invalid_bodies_are_bad_requests() {
    let app = test_app(3);

    let (status, _) = send(&app.router, start("u1", "ftp://example.com/file")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/start-scrape")
        .header("content-type", "application/json")
        .header("x-user-id", "u1")
        .body(Body::from("{\"link\": 1}"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Nothing was admitted
    let (_, body) = send(&app.router, get("/scrape-lock-status", "u1")).await;
    assert_eq!(body["locked"], false);
}
