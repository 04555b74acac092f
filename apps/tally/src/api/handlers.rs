//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ApiError, CalculateRequest, CalculateResponse, ClearResponse, ErrorResponse,
        HealthResponse, HistoryQuery, HistoryResponse, SessionResponse, SessionStatsResponse,
        StatsResponse,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tally_core::{CalcError, HistoryStore};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// CALCULATE HANDLER
// =============================================================================

/// Record a completed calculation.
pub async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<CalculateResponse>, ApiError> {
    let Json(request) = payload?;
    let calculation = request.into_calculation()?;

    let mut store = state.store.write().await;
    let entry = store.record(calculation)?;
    tracing::debug!(id = entry.id, expression = %entry.expression, "calculation recorded");

    let session_id = entry.session_id.unwrap_or_default();
    Ok(Json(CalculateResponse::saved(entry.id, session_id)))
}

// =============================================================================
// HISTORY HANDLERS
// =============================================================================

/// List recent calculations, newest first.
pub async fn history_handler(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query?;
    let store = state.store.read().await;
    let entries = store.list_recent(query.effective_limit())?;
    Ok(Json(HistoryResponse::from_entries(entries)))
}

/// Delete every stored calculation.
pub async fn clear_history_handler(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let mut store = state.store.write().await;
    let removed = store.clear_all()?;
    tracing::info!(removed, "history cleared");
    Ok(Json(ClearResponse::cleared(removed)))
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

/// Create a new session with a random id.
pub async fn create_session_handler(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut store = state.store.write().await;
    let session = store.create_session(&session_id)?;
    Ok(Json(SessionResponse::created(session.session_id)))
}

/// Counters of one session.
pub async fn session_stats_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatsResponse>, ApiError> {
    let store = state.store.read().await;
    let stats = store
        .session_stats(&session_id)?
        .ok_or(CalcError::SessionNotFound(session_id))?;
    Ok(Json(SessionStatsResponse {
        success: true,
        stats: stats.into(),
    }))
}

// =============================================================================
// STATS HANDLER
// =============================================================================

/// Summary of recent history.
pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, ApiError> {
    let store = state.store.read().await;
    let stats = store.stats()?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

// =============================================================================
// FALLBACK
// =============================================================================

/// Any route that does not exist.
pub async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Endpoint not found")),
    )
}
