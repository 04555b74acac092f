//! Integration tests for the Tally HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::json;
use std::sync::Mutex;
use tally::api::{
    ApiSecurity, AppState, CalculateResponse, ClearResponse, ErrorResponse, HealthResponse,
    HistoryResponse, SessionResponse, SessionStatsResponse, StatsResponse, create_router_with,
};
use tally_core::{HistoryBackend, HistoryStore, NewCalculation};

/// Mutex to serialize tests that modify env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a test server with a fresh in-memory store and no security.
fn create_test_server() -> TestServer {
    create_server_with(HistoryBackend::in_memory(), &ApiSecurity::default())
}

fn create_server_with(store: HistoryBackend, security: &ApiSecurity) -> TestServer {
    let router = create_router_with(AppState::new(store), security);
    TestServer::new(router).unwrap()
}

/// Create a test server with three recorded calculations.
fn create_populated_test_server() -> TestServer {
    let mut store = HistoryBackend::in_memory();
    for (expression, result) in [("5 + 3", "8"), ("8 × 2", "16"), ("16 ÷ 4", "4")] {
        store
            .record(NewCalculation::new(expression, result))
            .unwrap();
    }
    create_server_with(store, &ApiSecurity::default())
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/api/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "healthy");
    assert!(!health.message.is_empty());
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// CALCULATE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_calculate_with_session() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "5 + 3", "result": "8", "session_id": "abc"}))
        .await;

    response.assert_status_ok();
    let saved: CalculateResponse = response.json();
    assert!(saved.success);
    assert_eq!(saved.session_id, "abc");
    assert_eq!(saved.id, 1);
}

#[tokio::test]
async fn test_calculate_generates_session_id() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "5 + 3", "result": "8"}))
        .await;

    response.assert_status_ok();
    let saved: CalculateResponse = response.json();
    assert!(uuid::Uuid::parse_str(&saved.session_id).is_ok());
}

#[tokio::test]
async fn test_calculate_missing_field() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "5 + 3"}))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.contains("Missing expression or result"));
}

#[tokio::test]
async fn test_calculate_empty_expression() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "  ", "result": "8"}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_calculate_oversized_expression() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "9".repeat(300), "result": "8"}))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_calculate_mistyped_field() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": 5, "result": "8"}))
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_calculate_malformed_json() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .bytes("{not json".as_bytes().into())
        .content_type("application/json")
        .await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.starts_with("Invalid request body"));
}

#[tokio::test]
async fn test_calculate_counts_against_session() {
    let server = create_test_server();

    let session: SessionResponse = server.post("/api/session").await.json();
    for _ in 0..3 {
        server
            .post("/api/calculate")
            .json(&json!({"expression": "1 + 1", "result": "2", "session_id": session.session_id}))
            .await
            .assert_status_ok();
    }

    let response = server
        .get(&format!("/api/session/{}/stats", session.session_id))
        .await;
    response.assert_status_ok();
    let stats: SessionStatsResponse = response.json();
    assert_eq!(stats.stats.total_calculations, 3);
    assert!(stats.stats.last_used >= stats.stats.created_at);
}

#[tokio::test]
async fn test_body_limit() {
    let server = create_test_server();

    let response = server
        .post("/api/calculate")
        .json(&json!({"expression": "x".repeat(100 * 1024), "result": "8"}))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let error: ErrorResponse = response.json();
    assert!(!error.success);
}

// =============================================================================
// HISTORY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_history_empty() {
    let server = create_test_server();

    let response = server.get("/api/history").await;

    response.assert_status_ok();
    let history: HistoryResponse = response.json();
    assert!(history.success);
    assert_eq!(history.count, 0);
    assert!(history.history.is_empty());
}

#[tokio::test]
async fn test_history_newest_first() {
    let server = create_populated_test_server();

    let history: HistoryResponse = server.get("/api/history").await.json();

    assert_eq!(history.count, 3);
    let expressions: Vec<&str> = history
        .history
        .iter()
        .map(|h| h.expression.as_str())
        .collect();
    assert_eq!(expressions, vec!["16 ÷ 4", "8 × 2", "5 + 3"]);
}

#[tokio::test]
async fn test_history_limit() {
    let server = create_populated_test_server();

    let history: HistoryResponse = server.get("/api/history?limit=2").await.json();
    assert_eq!(history.count, 2);
    assert_eq!(history.history[0].result, "4");

    // Zero is clamped up to one.
    let history: HistoryResponse = server.get("/api/history?limit=0").await.json();
    assert_eq!(history.count, 1);
}

#[tokio::test]
async fn test_history_invalid_limit() {
    let server = create_populated_test_server();

    let response = server.get("/api/history?limit=many").await;

    response.assert_status_bad_request();
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.starts_with("Invalid query"));
}

#[tokio::test]
async fn test_clear_history() {
    let server = create_populated_test_server();

    let response = server.post("/api/history/clear").await;

    response.assert_status_ok();
    let cleared: ClearResponse = response.json();
    assert!(cleared.success);
    assert_eq!(cleared.removed, 3);

    let history: HistoryResponse = server.get("/api/history").await.json();
    assert_eq!(history.count, 0);
}

#[tokio::test]
async fn test_ids_not_reused_after_clear() {
    let server = create_populated_test_server();
    server.post("/api/history/clear").await.assert_status_ok();

    let saved: CalculateResponse = server
        .post("/api/calculate")
        .json(&json!({"expression": "2 - 1", "result": "1"}))
        .await
        .json();
    assert_eq!(saved.id, 4);
}

// =============================================================================
// SESSION ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_create_session() {
    let server = create_test_server();

    let response = server.post("/api/session").await;

    response.assert_status_ok();
    let session: SessionResponse = response.json();
    assert!(session.success);
    assert!(uuid::Uuid::parse_str(&session.session_id).is_ok());

    let stats: SessionStatsResponse = server
        .get(&format!("/api/session/{}/stats", session.session_id))
        .await
        .json();
    assert_eq!(stats.stats.total_calculations, 0);
}

#[tokio::test]
async fn test_session_stats_unknown() {
    let server = create_test_server();

    let response = server.get("/api/session/does-not-exist/stats").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert!(error.error.contains("does-not-exist"));
}

// =============================================================================
// STATS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_stats_empty() {
    let server = create_test_server();

    let response = server.get("/api/stats").await;

    response.assert_status_ok();
    let stats: StatsResponse = response.json();
    assert_eq!(stats.stats.total_calculations, 0);
    assert!(stats.stats.date_range.is_none());
}

#[tokio::test]
async fn test_stats_counts_operators() {
    let server = create_populated_test_server();

    let stats: StatsResponse = server.get("/api/stats").await.json();

    assert_eq!(stats.stats.total_calculations, 3);
    assert_eq!(stats.stats.operations.add, 1);
    assert_eq!(stats.stats.operations.multiply, 1);
    assert_eq!(stats.stats.operations.divide, 1);
    assert_eq!(stats.stats.operations.subtract, 0);
    let range = stats.stats.date_range.unwrap();
    assert!(range.oldest <= range.newest);
}

#[tokio::test]
async fn test_stats_json_shape() {
    let server = create_populated_test_server();

    let body: serde_json::Value = server.get("/api/stats").await.json();

    assert_eq!(body["success"], true);
    assert!(body["stats"]["operations"]["add"].is_u64());
    assert!(body["stats"]["date_range"]["oldest"].is_string());
}

// =============================================================================
// FALLBACK TESTS
// =============================================================================

#[tokio::test]
async fn test_unknown_endpoint() {
    let server = create_test_server();

    let response = server.get("/api/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let error: ErrorResponse = response.json();
    assert!(!error.success);
    assert_eq!(error.error, "Endpoint not found");
}

#[tokio::test]
async fn test_wrong_method() {
    let server = create_test_server();

    let response = server.get("/api/calculate").await;

    response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// PERSISTENT BACKEND TESTS
// =============================================================================

#[tokio::test]
async fn test_redb_backend_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let store = HistoryBackend::with_redb(temp.path().join("history.redb")).unwrap();
    let server = create_server_with(store, &ApiSecurity::default());

    server
        .post("/api/calculate")
        .json(&json!({"expression": "7 × 6", "result": "42"}))
        .await
        .assert_status_ok();

    let history: HistoryResponse = server.get("/api/history").await.json();
    assert_eq!(history.count, 1);
    assert_eq!(history.history[0].result, "42");
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    create_server_with(
        HistoryBackend::in_memory(),
        &ApiSecurity::default().with_api_key(api_key),
    )
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/api/stats")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key).parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/api/stats")
        .add_header(header::AUTHORIZATION, api_key.parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .post("/api/history/clear")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
    let error: ErrorResponse = response.json();
    assert_eq!(error.error, "Unauthorized");
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("required-key");

    let response = server.get("/api/history").await;

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/api/health").await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_empty_api_key_disables_auth() {
    let server = create_auth_test_server("");

    let response = server.get("/api/stats").await;

    response.assert_status_ok();
}

// =============================================================================
// RATE LIMIT TESTS
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let server = create_server_with(
        HistoryBackend::in_memory(),
        &ApiSecurity::default().with_rate_limit(2),
    );

    server.get("/api/health").await.assert_status_ok();
    server.get("/api/health").await.assert_status_ok();
    let response = server.get("/api/health").await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

// =============================================================================
// ENVIRONMENT CONFIGURATION TESTS
// =============================================================================

#[test]
fn test_security_from_env() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    // SAFETY: Env access is serialized by ENV_TEST_MUTEX.
    unsafe {
        std::env::set_var("TALLY_API_KEY", "from-env");
        std::env::set_var("TALLY_RATE_LIMIT", "7");
        std::env::set_var("TALLY_CORS_ORIGINS", "http://example.com");
    }
    let security = ApiSecurity::from_env();
    // SAFETY: Env access is serialized by ENV_TEST_MUTEX.
    unsafe {
        std::env::remove_var("TALLY_API_KEY");
        std::env::remove_var("TALLY_RATE_LIMIT");
        std::env::remove_var("TALLY_CORS_ORIGINS");
    }

    assert_eq!(security.api_key.as_deref(), Some("from-env"));
    assert_eq!(security.rate_limit, 7);
    assert_eq!(security.cors_origins.as_deref(), Some("http://example.com"));

    let defaults = ApiSecurity::from_env();
    assert!(defaults.api_key.is_none());
    assert_eq!(defaults.rate_limit, tally::api::DEFAULT_RATE_LIMIT);
}
