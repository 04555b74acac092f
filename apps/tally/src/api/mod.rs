//! # Tally HTTP API Module
//!
//! This module implements the history service using axum.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/calculate` - Record a completed calculation
//! - `GET /api/history?limit=N` - Recent calculations, newest first
//! - `POST /api/history/clear` - Delete all calculations
//! - `POST /api/session` - Create a session
//! - `GET /api/session/{id}/stats` - Session counters
//! - `GET /api/stats` - Operator counts and date range
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TALLY_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TALLY_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `TALLY_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{HEALTH_PATH, get_api_key_from_env, keys_match};
pub use middleware::{DEFAULT_RATE_LIMIT, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, CalculateRequest, CalculateResponse, ClearResponse, ErrorResponse, HealthResponse,
    HistoryItem, HistoryQuery, HistoryResponse, SessionResponse, SessionStatsBody,
    SessionStatsResponse, StatsResponse,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tally_core::{CalcError, HistoryBackend};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the history store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HistoryBackend>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: HistoryBackend) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }
}

// =============================================================================
// SECURITY SETTINGS
// =============================================================================

/// Authentication, rate limiting and CORS settings of the router.
///
/// `Default` is fully open: no key, no rate limit, localhost CORS.
#[derive(Debug, Clone, Default)]
pub struct ApiSecurity {
    pub api_key: Option<String>,
    /// Requests per second; 0 disables the limiter.
    pub rate_limit: u32,
    pub cors_origins: Option<String>,
}

impl ApiSecurity {
    /// Read `TALLY_API_KEY`, `TALLY_RATE_LIMIT` and `TALLY_CORS_ORIGINS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: get_api_key_from_env(),
            rate_limit: get_rate_limit_from_env(),
            cors_origins: std::env::var("TALLY_CORS_ORIGINS").ok(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into()).filter(|k: &String| !k.is_empty());
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.rate_limit = requests_per_second;
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer.
///
/// - `"*"`: allows all origins
/// - not set: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: allowing ALL origins (TALLY_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: no valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                restrictive_cors(allowed_origins)
            }
        }
        None => build_localhost_cors(),
    }
}

/// CORS layer that only allows the usual local front-end origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5000",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5000",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    restrictive_cors(origins)
}

fn restrictive_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with security settings read from the environment.
pub fn create_router(state: AppState) -> Router {
    create_router_with(state, &ApiSecurity::from_env())
}

/// Create the router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router_with(state: AppState, security: &ApiSecurity) -> Router {
    let mut router = Router::new()
        .route(HEALTH_PATH, get(handlers::health_handler))
        .route("/api/calculate", post(handlers::calculate_handler))
        .route("/api/history", get(handlers::history_handler))
        .route("/api/history/clear", post(handlers::clear_history_handler))
        .route("/api/session", post(handlers::create_session_handler))
        .route(
            "/api/session/{session_id}/stats",
            get(handlers::session_stats_handler),
        )
        .route("/api/stats", get(handlers::stats_handler))
        .fallback(handlers::not_found_handler);

    match security.api_key.as_deref() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let key: auth::ApiKey = Arc::from(key);
            router = router.layer(axum_middleware::from_fn_with_state(
                key,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED - set TALLY_API_KEY to require a bearer token"
        ),
    }

    if security.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", security.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(security.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(security.cors_origins.as_deref()))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, store: HistoryBackend) -> Result<(), CalcError> {
    let backend = store.kind();
    let persistent = store.is_persistent();
    let router = create_router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CalcError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!(%backend, persistent, "Tally history server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await
        .map_err(|e| CalcError::IoError(format!("Server error: {}", e)))
}
