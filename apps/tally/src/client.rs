//! # Tally HTTP Client
//!
//! Wrapper around the history service REST API, used by the CLI when
//! `--history-url` is set and by `HttpSink`.

use crate::api::{
    CalculateRequest, CalculateResponse, ClearResponse, ErrorResponse, HealthResponse,
    HistoryResponse, SessionResponse, SessionStatsResponse, StatsResponse,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the HTTP client layer.
#[derive(Debug)]
pub enum ClientError {
    /// The base URL cannot be used.
    InvalidUrl(String),
    /// Cannot reach the history service.
    ConnectionFailed(String),
    /// 400 Bad Request.
    BadRequest(String),
    /// 401 Unauthorized - invalid or missing API key.
    Unauthorized,
    /// 404 Not Found.
    NotFound(String),
    /// 429 Too Many Requests.
    RateLimited,
    /// Server returned a 5xx error.
    ServerError(u16, String),
    /// Failed to parse response body.
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid history service URL: {msg}"),
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to history service at {url}"),
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing API key"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::RateLimited => write!(f, "Rate limited: too many requests"),
            Self::ServerError(status, msg) => write!(f, "Server error ({status}): {msg}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// HTTP client for the history service.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HistoryClient {
    /// Create a client pointing at the given service URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// The service URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a request with optional Bearer auth.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let mut req = self.http.request(method, self.endpoint(segments)?);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        Ok(req)
    }

    /// Send a request and handle connection errors.
    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        req.send()
            .await
            .map_err(|e| ClientError::ConnectionFailed(format!("{}: {e}", self.base_url)))
    }

    /// Check the status code and decode the body.
    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| ClientError::ParseError(e.to_string()));
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        Err(match status {
            StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            other => ClientError::ServerError(other.as_u16(), message),
        })
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let req = self.request(Method::GET, &["api", "health"])?;
        Self::handle_response(self.send(req).await?).await
    }

    /// POST /api/calculate → store one calculation.
    pub async fn record_calculation(
        &self,
        request: &CalculateRequest,
    ) -> Result<CalculateResponse, ClientError> {
        let req = self
            .request(Method::POST, &["api", "calculate"])?
            .json(request);
        Self::handle_response(self.send(req).await?).await
    }

    /// GET /api/history → most recent calculations, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<HistoryResponse, ClientError> {
        let req = self
            .request(Method::GET, &["api", "history"])?
            .query(&[("limit", limit)]);
        Self::handle_response(self.send(req).await?).await
    }

    /// POST /api/history/clear → delete all calculations.
    pub async fn clear_all(&self) -> Result<ClearResponse, ClientError> {
        let req = self.request(Method::POST, &["api", "history", "clear"])?;
        Self::handle_response(self.send(req).await?).await
    }

    /// POST /api/session → create a session.
    pub async fn create_session(&self) -> Result<SessionResponse, ClientError> {
        let req = self.request(Method::POST, &["api", "session"])?;
        Self::handle_response(self.send(req).await?).await
    }

    /// GET /api/session/{id}/stats
    pub async fn session_stats(
        &self,
        session_id: &str,
    ) -> Result<SessionStatsResponse, ClientError> {
        let req = self.request(Method::GET, &["api", "session", session_id, "stats"])?;
        Self::handle_response(self.send(req).await?).await
    }

    /// GET /api/stats
    pub async fn stats(&self) -> Result<StatsResponse, ClientError> {
        let req = self.request(Method::GET, &["api", "stats"])?;
        Self::handle_response(self.send(req).await?).await
    }
}
