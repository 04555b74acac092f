//! # History Backend
//!
//! Selects the history store at composition time.
//!
//! - `InMemory`: uses `MemoryHistory` (fast, volatile)
//! - `Persistent`: uses `RedbHistory` for disk-backed ACID storage

use crate::history::{
    HistoryEntry, HistoryStats, HistoryStore, MemoryHistory, NewCalculation, SessionStats,
};
use crate::storage::RedbHistory;
use crate::CalcError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which kind of store to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Redb,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Redb => "redb",
        })
    }
}

impl FromStr for BackendKind {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "redb" | "file" | "disk" => Ok(Self::Redb),
            other => Err(CalcError::SerializationError(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

/// Storage backend for calculation history.
#[derive(Debug)]
pub enum HistoryBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryHistory),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbHistory),
}

impl Default for HistoryBackend {
    fn default() -> Self {
        Self::InMemory(MemoryHistory::new())
    }
}

// NOTE: HistoryBackend does NOT implement Clone.
// RedbHistory (database handle) cannot be safely cloned.

impl HistoryBackend {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open or create a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, CalcError> {
        Ok(Self::Persistent(RedbHistory::open(path)?))
    }

    /// Open the backend of the given kind. `path` is ignored for `Memory`.
    pub fn open(kind: BackendKind, path: impl AsRef<Path>) -> Result<Self, CalcError> {
        match kind {
            BackendKind::Memory => Ok(Self::in_memory()),
            BackendKind::Redb => Self::with_redb(path),
        }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// The kind of this backend.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::InMemory(_) => BackendKind::Memory,
            Self::Persistent(_) => BackendKind::Redb,
        }
    }

    fn store(&self) -> &dyn HistoryStore {
        match self {
            Self::InMemory(m) => m,
            Self::Persistent(r) => r,
        }
    }

    fn store_mut(&mut self) -> &mut dyn HistoryStore {
        match self {
            Self::InMemory(m) => m,
            Self::Persistent(r) => r,
        }
    }
}

impl HistoryStore for HistoryBackend {
    fn record(&mut self, calculation: NewCalculation) -> Result<HistoryEntry, CalcError> {
        self.store_mut().record(calculation)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, CalcError> {
        self.store().list_recent(limit)
    }

    fn clear_all(&mut self) -> Result<usize, CalcError> {
        self.store_mut().clear_all()
    }

    fn create_session(&mut self, session_id: &str) -> Result<SessionStats, CalcError> {
        self.store_mut().create_session(session_id)
    }

    fn session_stats(&self, session_id: &str) -> Result<Option<SessionStats>, CalcError> {
        self.store().session_stats(session_id)
    }

    fn len(&self) -> Result<usize, CalcError> {
        self.store().len()
    }

    fn stats(&self) -> Result<HistoryStats, CalcError> {
        self.store().stats()
    }
}
