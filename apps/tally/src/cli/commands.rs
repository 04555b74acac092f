//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! History commands run against the local store, or against the history
//! service when `history.url` is configured. Both paths produce the same
//! response types, so text and JSON output do not depend on where the data
//! came from.

use super::repl::{Recorder, render_snapshot, run_repl};
use crate::api::{
    self, ClearResponse, HistoryQuery, HistoryResponse, SessionResponse, SessionStatsResponse,
    StatsResponse,
};
use crate::client::{ClientError, HistoryClient};
use crate::config::AppConfig;
use serde::Serialize;
use std::path::Path;
use tally_core::{
    CalcError, Calculator, HistoryBackend, HistoryStore, RedbHistory, Theme, parse_keys,
};

// =============================================================================
// HISTORY TARGET
// =============================================================================

/// Where history commands are executed.
enum HistoryTarget {
    Local(HistoryBackend),
    Remote(HistoryClient),
}

fn remote_error(e: ClientError) -> CalcError {
    match e {
        ClientError::BadRequest(msg) => CalcError::InvalidRecord(msg),
        ClientError::NotFound(msg) => CalcError::SessionNotFound(msg),
        other => CalcError::IoError(other.to_string()),
    }
}

fn build_client(config: &AppConfig, url: &str) -> Result<HistoryClient, CalcError> {
    HistoryClient::new(url, config.history.api_key.clone()).map_err(remote_error)
}

fn open_target(config: &AppConfig) -> Result<HistoryTarget, CalcError> {
    match &config.history.url {
        Some(url) => Ok(HistoryTarget::Remote(build_client(config, url)?)),
        None => Ok(HistoryTarget::Local(open_store(config)?)),
    }
}

/// Open the configured local store.
pub fn open_store(config: &AppConfig) -> Result<HistoryBackend, CalcError> {
    HistoryBackend::open(config.storage.backend, &config.storage.database)
}

/// Build the recorder used by the REPL and `eval --record`.
async fn open_recorder(
    config: &AppConfig,
    session_id: Option<String>,
) -> Result<Recorder, CalcError> {
    let recorder = match &config.history.url {
        Some(url) => Recorder::remote(build_client(config, url)?, session_id).await?,
        None => Recorder::local(open_store(config)?, session_id)?,
    };
    tracing::debug!(session = recorder.session_id(), "recording calculations");
    Ok(recorder)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CalcError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CalcError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// REPL COMMAND
// =============================================================================

/// Start the interactive calculator.
pub async fn cmd_repl(
    config: &AppConfig,
    theme: Option<Theme>,
    session_id: Option<String>,
) -> Result<(), CalcError> {
    let recorder = open_recorder(config, session_id).await?;
    let calc = Calculator::with_sink(recorder.sink());
    let theme = theme.unwrap_or(config.ui.theme);
    tracing::debug!(%theme, backend = %config.storage.backend, "starting repl");
    run_repl(calc, theme, Some(recorder), config.history.limit).await
}

// =============================================================================
// EVAL COMMAND
// =============================================================================

/// Run one key sequence on a fresh calculator and print the result.
pub async fn cmd_eval(
    config: &AppConfig,
    keys: &str,
    record: bool,
    json_mode: bool,
) -> Result<(), CalcError> {
    let events = parse_keys(keys)?;

    let recorder = if record {
        Some(open_recorder(config, None).await?)
    } else {
        None
    };
    let mut calc = match &recorder {
        Some(recorder) => Calculator::with_sink(recorder.sink()),
        None => Calculator::new(),
    };

    calc.dispatch_all(events);

    if let Some(recorder) = &recorder {
        recorder.close().await?;
    }

    let snapshot = calc.snapshot();
    if json_mode {
        print_json(&snapshot)
    } else {
        println!("{}", render_snapshot(&snapshot, config.ui.theme));
        Ok(())
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), CalcError> {
    let store = open_store(config)?;
    let host = &config.server.host;
    let port = config.server.port;

    println!("Tally History Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", store.kind());
    if store.is_persistent() {
        println!("  Database: {:?}", config.storage.database);
    }
    println!();
    println!("Endpoints:");
    println!("  GET  /api/health             - Health check");
    println!("  POST /api/calculate          - Record a calculation");
    println!("  GET  /api/history?limit=N    - Recent calculations");
    println!("  POST /api/history/clear      - Clear history");
    println!("  POST /api/session            - Create a session");
    println!("  GET  /api/session/{{id}}/stats - Session counters");
    println!("  GET  /api/stats              - Overall statistics");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, store).await
}

// =============================================================================
// HISTORY COMMANDS
// =============================================================================

/// List recent calculations.
pub async fn cmd_history(config: &AppConfig, limit: usize, json_mode: bool) -> Result<(), CalcError> {
    let limit = HistoryQuery { limit: Some(limit) }.effective_limit();
    let response = match open_target(config)? {
        HistoryTarget::Local(store) => HistoryResponse::from_entries(store.list_recent(limit)?),
        HistoryTarget::Remote(client) => client.list_recent(limit).await.map_err(remote_error)?,
    };

    if json_mode {
        return print_json(&response);
    }

    if response.history.is_empty() {
        println!("No calculations recorded.");
        return Ok(());
    }
    println!("Recent calculations ({})", response.count);
    println!("======================");
    for item in &response.history {
        println!(
            "{:>6}  {}  {} = {}",
            item.id,
            item.timestamp.format("%Y-%m-%d %H:%M:%S"),
            item.expression,
            item.result
        );
    }
    Ok(())
}

/// Delete all calculations.
pub async fn cmd_clear_history(config: &AppConfig, json_mode: bool) -> Result<(), CalcError> {
    let response = match open_target(config)? {
        HistoryTarget::Local(mut store) => ClearResponse::cleared(store.clear_all()?),
        HistoryTarget::Remote(client) => client.clear_all().await.map_err(remote_error)?,
    };

    if json_mode {
        return print_json(&response);
    }
    println!("{} ({} removed)", response.message, response.removed);
    Ok(())
}

/// Show overall statistics.
pub async fn cmd_stats(config: &AppConfig, json_mode: bool) -> Result<(), CalcError> {
    let response = match open_target(config)? {
        HistoryTarget::Local(store) => StatsResponse {
            success: true,
            stats: store.stats()?,
        },
        HistoryTarget::Remote(client) => client.stats().await.map_err(remote_error)?,
    };

    if json_mode {
        return print_json(&response);
    }

    let stats = &response.stats;
    println!("Tally History Statistics");
    println!("========================");
    println!("Calculations: {}", stats.total_calculations);
    println!("  +  {}", stats.operations.add);
    println!("  -  {}", stats.operations.subtract);
    println!("  ×  {}", stats.operations.multiply);
    println!("  ÷  {}", stats.operations.divide);
    match &stats.date_range {
        Some(range) => {
            println!("Oldest:       {}", range.oldest.to_rfc3339());
            println!("Newest:       {}", range.newest.to_rfc3339());
        }
        None => println!("Date range:   (empty)"),
    }
    Ok(())
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

/// Create a session.
pub async fn cmd_session_new(config: &AppConfig, json_mode: bool) -> Result<(), CalcError> {
    let response = match open_target(config)? {
        HistoryTarget::Local(mut store) => {
            let session_id = uuid::Uuid::new_v4().to_string();
            let session = store.create_session(&session_id)?;
            SessionResponse::created(session.session_id)
        }
        HistoryTarget::Remote(client) => client.create_session().await.map_err(remote_error)?,
    };

    if json_mode {
        return print_json(&response);
    }
    println!("{}", response.session_id);
    Ok(())
}

/// Show counters of one session.
pub async fn cmd_session_stats(
    config: &AppConfig,
    session_id: &str,
    json_mode: bool,
) -> Result<(), CalcError> {
    let response = match open_target(config)? {
        HistoryTarget::Local(store) => {
            let stats = store
                .session_stats(session_id)?
                .ok_or_else(|| CalcError::SessionNotFound(session_id.to_string()))?;
            SessionStatsResponse {
                success: true,
                stats: stats.into(),
            }
        }
        HistoryTarget::Remote(client) => client
            .session_stats(session_id)
            .await
            .map_err(|e| match e {
                ClientError::NotFound(_) => CalcError::SessionNotFound(session_id.to_string()),
                other => remote_error(other),
            })?,
    };

    if json_mode {
        return print_json(&response);
    }
    println!("Session:      {}", session_id);
    println!("Calculations: {}", response.stats.total_calculations);
    println!("Created:      {}", response.stats.created_at.to_rfc3339());
    println!("Last used:    {}", response.stats.last_used.to_rfc3339());
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty redb history database.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), CalcError> {
    if db_path.exists() {
        if !force {
            return Err(CalcError::IoError(format!(
                "Database {:?} already exists. Use --force to overwrite.",
                db_path
            )));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| CalcError::IoError(format!("Cannot remove {:?}: {}", db_path, e)))?;
    }

    let _store = RedbHistory::open(db_path)?;
    println!("Initialized new history database at {:?}", db_path);
    Ok(())
}
