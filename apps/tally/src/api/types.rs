//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. The same types
//! are used by `HistoryClient` to decode responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{
    CalcError, HistoryEntry, HistoryStats, NewCalculation, SessionStats,
    primitives::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT},
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            message: "Tally history API is running".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// CALCULATE REQUEST/RESPONSE
// =============================================================================

/// Record-a-calculation request.
///
/// Fields are optional at the JSON level so that a missing field produces
/// the API's own 400 body instead of the extractor's rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl CalculateRequest {
    pub fn new(expression: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            result: Some(result.into()),
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Convert to a calculation record, validating fields.
    ///
    /// A request without a session id gets a freshly generated one.
    pub fn into_calculation(self) -> Result<NewCalculation, CalcError> {
        let (Some(expression), Some(result)) = (self.expression, self.result) else {
            return Err(CalcError::InvalidRecord(
                "Missing expression or result".to_string(),
            ));
        };
        let session_id = self
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let calculation = NewCalculation::new(expression, result).with_session(session_id);
        calculation.validate()?;
        Ok(calculation)
    }
}

/// Record-a-calculation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub id: u64,
}

impl CalculateResponse {
    pub fn saved(id: u64, session_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message: "Calculation saved successfully".to_string(),
            session_id: session_id.into(),
            id,
        }
    }
}

// =============================================================================
// HISTORY
// =============================================================================

/// Query string of `GET /api/history`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// Requested limit, defaulted and clamped to `1..=MAX_HISTORY_LIMIT`.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// One history row on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: u64,
    pub expression: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryItem {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.id,
            expression: entry.expression,
            result: entry.result,
            timestamp: entry.timestamp,
        }
    }
}

/// History listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: Vec<HistoryItem>,
    pub count: usize,
}

impl HistoryResponse {
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let history: Vec<HistoryItem> = entries.into_iter().map(HistoryItem::from).collect();
        Self {
            success: true,
            count: history.len(),
            history,
        }
    }
}

/// Clear-history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub removed: usize,
}

impl ClearResponse {
    pub fn cleared(removed: usize) -> Self {
        Self {
            success: true,
            message: "History cleared successfully".to_string(),
            removed,
        }
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Create-session response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session_id: String,
    pub message: String,
}

impl SessionResponse {
    pub fn created(session_id: impl Into<String>) -> Self {
        Self {
            success: true,
            session_id: session_id.into(),
            message: "Session created successfully".to_string(),
        }
    }
}

/// Counters of one session on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatsBody {
    pub total_calculations: u64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl From<SessionStats> for SessionStatsBody {
    fn from(stats: SessionStats) -> Self {
        Self {
            total_calculations: stats.total_calculations,
            created_at: stats.created_at,
            last_used: stats.last_used,
        }
    }
}

/// Session statistics response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatsResponse {
    pub success: bool,
    pub stats: SessionStatsBody,
}

// =============================================================================
// AGGREGATE STATS
// =============================================================================

/// Overall statistics response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: HistoryStats,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body shared by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// A failed request: status code plus `ErrorResponse` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl From<CalcError> for ApiError {
    fn from(e: CalcError) -> Self {
        let status = match e {
            CalcError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
            CalcError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    /// Malformed or mistyped bodies are a 400; size and content-type
    /// rejections keep their own status.
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
            other => other,
        };
        Self {
            status,
            message: format!("Invalid request body: {}", rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid query: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}
