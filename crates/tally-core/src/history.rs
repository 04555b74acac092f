//! # Calculation History
//!
//! The persistence side of the calculator, split in two seams:
//!
//! - [`HistorySink`]: what the engine talks to. One call per successful
//!   evaluation, fire-and-forget.
//! - [`HistoryStore`]: what the presentation layer and the history service
//!   talk to. Record, list, clear, plus session bookkeeping.
//!
//! [`MemoryHistory`] is the in-memory store; the disk-backed one lives in
//! [`crate::storage`].

use crate::primitives::{
    MAX_EXPRESSION_LENGTH, MAX_HISTORY_LIMIT, MAX_RESULT_LENGTH, MAX_SESSION_ID_LENGTH,
    STATS_WINDOW,
};
use crate::{CalcError, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// HISTORY SINK
// =============================================================================

/// Receiver of completed calculations.
///
/// The engine calls `record_calculation` after every successful evaluation
/// and ignores the outcome apart from logging it. Implementations must
/// return promptly: anything slow (disk, network) belongs on a background
/// task owned by the sink.
pub trait HistorySink: Send + Sync {
    /// Hand a completed calculation to the sink.
    ///
    /// An error means the notification was dropped before it was queued.
    fn record_calculation(&self, expression: &str, result: &str) -> Result<(), CalcError>;
}

// =============================================================================
// RECORDS
// =============================================================================

/// A calculation about to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalculation {
    pub expression: String,
    pub result: String,
    pub session_id: Option<String>,
}

impl NewCalculation {
    /// Create a record without a session.
    pub fn new(expression: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            result: result.into(),
            session_id: None,
        }
    }

    /// Attach a session identifier.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Check field presence and length limits.
    ///
    /// # Errors
    ///
    /// Returns `CalcError::InvalidRecord` if:
    /// - `expression` or `result` is empty (after trimming)
    /// - any field exceeds its maximum length
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.expression.trim().is_empty() {
            return Err(CalcError::InvalidRecord("expression is empty".to_string()));
        }
        if self.result.trim().is_empty() {
            return Err(CalcError::InvalidRecord("result is empty".to_string()));
        }
        if self.expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(CalcError::InvalidRecord(format!(
                "expression length {} exceeds maximum {} bytes",
                self.expression.len(),
                MAX_EXPRESSION_LENGTH
            )));
        }
        if self.result.len() > MAX_RESULT_LENGTH {
            return Err(CalcError::InvalidRecord(format!(
                "result length {} exceeds maximum {} bytes",
                self.result.len(),
                MAX_RESULT_LENGTH
            )));
        }
        if let Some(session_id) = &self.session_id {
            validate_session_id(session_id)?;
        }
        Ok(())
    }

    /// Turn the record into a stored entry.
    pub(crate) fn into_entry(self, id: u64, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id,
            expression: self.expression,
            result: self.result,
            session_id: self.session_id,
            timestamp,
        }
    }
}

/// Check a session identifier.
pub(crate) fn validate_session_id(session_id: &str) -> Result<(), CalcError> {
    if session_id.is_empty() {
        return Err(CalcError::InvalidRecord("session id is empty".to_string()));
    }
    if session_id.len() > MAX_SESSION_ID_LENGTH {
        return Err(CalcError::InvalidRecord(format!(
            "session id length {} exceeds maximum {} bytes",
            session_id.len(),
            MAX_SESSION_ID_LENGTH
        )));
    }
    Ok(())
}

/// A stored calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Store-assigned id, monotonic and never reused.
    pub id: u64,
    pub expression: String,
    pub result: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// The operator of the stored expression, if one can be recognized.
    ///
    /// Expressions are stored as `<a> <op> <b>`, so the operator is the
    /// middle whitespace-separated token.
    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        let mut tokens = self.expression.split_whitespace();
        let _lhs = tokens.next()?;
        Operator::from_symbol(tokens.next()?)
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// Usage counters for one calculator session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub total_calculations: u64,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl SessionStats {
    /// A fresh session with no calculations.
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            total_calculations: 0,
            created_at: now,
            last_used: now,
        }
    }

    /// Count one calculation against this session.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.total_calculations = self.total_calculations.saturating_add(1);
        self.last_used = now;
    }
}

// =============================================================================
// AGGREGATE STATISTICS
// =============================================================================

/// Per-operator counts over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub add: u64,
    pub subtract: u64,
    pub multiply: u64,
    pub divide: u64,
}

impl OperationCounts {
    fn count(&mut self, operator: Operator) {
        let slot = match operator {
            Operator::Add => &mut self.add,
            Operator::Subtract => &mut self.subtract,
            Operator::Multiply => &mut self.multiply,
            Operator::Divide => &mut self.divide,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Oldest and newest timestamps in a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

/// Summary of recent history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_calculations: usize,
    pub operations: OperationCounts,
    pub date_range: Option<DateRange>,
}

impl HistoryStats {
    /// Summarize a set of entries.
    #[must_use]
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        let mut operations = OperationCounts::default();
        for operator in entries.iter().filter_map(HistoryEntry::operator) {
            operations.count(operator);
        }

        let oldest = entries.iter().map(|e| e.timestamp).min();
        let newest = entries.iter().map(|e| e.timestamp).max();
        let date_range = oldest
            .zip(newest)
            .map(|(oldest, newest)| DateRange { oldest, newest });

        Self {
            total_calculations: entries.len(),
            operations,
            date_range,
        }
    }
}

// =============================================================================
// HISTORYSTORE TRAIT
// =============================================================================

/// Queryable storage for calculations and sessions.
///
/// All fallible operations return `Result<T, CalcError>` so in-memory and
/// persistent stores can be used uniformly.
pub trait HistoryStore {
    /// Validate and store a calculation, returning the stored entry.
    ///
    /// A known `session_id` has its counters updated; an unknown one is kept
    /// on the entry without creating a session.
    fn record(&mut self, calculation: NewCalculation) -> Result<HistoryEntry, CalcError>;

    /// Most recent entries, newest first. `limit` is clamped to
    /// `MAX_HISTORY_LIMIT`.
    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, CalcError>;

    /// Remove every entry. Sessions are kept. Returns the number removed.
    fn clear_all(&mut self) -> Result<usize, CalcError>;

    /// Create a session, or return the existing one unchanged.
    fn create_session(&mut self, session_id: &str) -> Result<SessionStats, CalcError>;

    /// Look up a session.
    fn session_stats(&self, session_id: &str) -> Result<Option<SessionStats>, CalcError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, CalcError>;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> Result<bool, CalcError> {
        Ok(self.len()? == 0)
    }

    /// Summary of the most recent `STATS_WINDOW` entries.
    fn stats(&self) -> Result<HistoryStats, CalcError> {
        let entries = self.list_recent(STATS_WINDOW)?;
        Ok(HistoryStats::from_entries(&entries))
    }
}

/// Clamp a requested listing size into `0..=MAX_HISTORY_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_HISTORY_LIMIT)
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile history store.
///
/// Uses `BTreeMap` so listings come out in id order without sorting.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: BTreeMap<u64, HistoryEntry>,
    sessions: BTreeMap<String, SessionStats>,
    next_id: u64,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryHistory {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn record(&mut self, calculation: NewCalculation) -> Result<HistoryEntry, CalcError> {
        calculation.validate()?;

        let now = Utc::now();
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);

        if let Some(session) = calculation
            .session_id
            .as_deref()
            .and_then(|sid| self.sessions.get_mut(sid))
        {
            session.touch(now);
        }

        let entry = calculation.into_entry(id, now);
        self.entries.insert(id, entry.clone());
        Ok(entry)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, CalcError> {
        Ok(self
            .entries
            .values()
            .rev()
            .take(clamp_limit(limit))
            .cloned()
            .collect())
    }

    fn clear_all(&mut self) -> Result<usize, CalcError> {
        let removed = self.entries.len();
        self.entries.clear();
        Ok(removed)
    }

    fn create_session(&mut self, session_id: &str) -> Result<SessionStats, CalcError> {
        validate_session_id(session_id)?;
        let session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionStats::new(session_id, Utc::now()));
        Ok(session.clone())
    }

    fn session_stats(&self, session_id: &str) -> Result<Option<SessionStats>, CalcError> {
        Ok(self.sessions.get(session_id).cloned())
    }

    fn len(&self) -> Result<usize, CalcError> {
        Ok(self.entries.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
