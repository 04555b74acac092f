//! # redb-backed History Storage
//!
//! A disk-backed history store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Entries and sessions are stored as postcard bytes. The next entry id is
//! kept in a metadata table so ids stay monotonic across reopen and
//! clear-all.

use crate::history::{
    HistoryEntry, HistoryStore, NewCalculation, SessionStats, clamp_limit, validate_session_id,
};
use crate::CalcError;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for entries: entry id -> serialized HistoryEntry bytes
const ENTRIES: TableDefinition<u64, &[u8]> = TableDefinition::new("entries");

/// Table for sessions: session id -> serialized SessionStats bytes
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_ENTRY_ID: &str = "next_entry_id";

fn io_err(e: impl std::fmt::Display) -> CalcError {
    CalcError::IoError(e.to_string())
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CalcError> {
    postcard::to_allocvec(value).map_err(|e| CalcError::SerializationError(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CalcError> {
    postcard::from_bytes(bytes).map_err(|e| CalcError::SerializationError(e.to_string()))
}

/// A disk-backed history store using redb.
pub struct RedbHistory {
    /// The redb database handle.
    db: Database,
    /// Next id to assign, mirrored from the metadata table.
    next_id: u64,
}

impl std::fmt::Debug for RedbHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbHistory")
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl RedbHistory {
    /// Open or create a history database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CalcError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ENTRIES).map_err(io_err)?;
            let _ = write_txn.open_table(SESSIONS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let next_id = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get(NEXT_ENTRY_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(1)
        };

        tracing::debug!(path = %path.as_ref().display(), next_id, "opened history store");

        Ok(Self { db, next_id })
    }

    /// Compact the database file, releasing space freed by deletions.
    pub fn compact(&mut self) -> Result<(), CalcError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn read_session(&self, session_id: &str) -> Result<Option<SessionStats>, CalcError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SESSIONS).map_err(io_err)?;
        table
            .get(session_id)
            .map_err(io_err)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }
}

// =============================================================================
// HISTORYSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl HistoryStore for RedbHistory {
    fn record(&mut self, calculation: NewCalculation) -> Result<HistoryEntry, CalcError> {
        calculation.validate()?;

        let now = Utc::now();
        let id = self.next_id;
        let next_id = id.saturating_add(1);

        let write_txn = self.db.begin_write().map_err(io_err)?;
        let entry = {
            let mut sessions = write_txn.open_table(SESSIONS).map_err(io_err)?;
            if let Some(session_id) = calculation.session_id.as_deref() {
                // Read-modify-write within the same transaction.
                let existing: Option<SessionStats> = sessions
                    .get(session_id)
                    .map_err(io_err)?
                    .map(|bytes| decode(bytes.value()))
                    .transpose()?;
                if let Some(mut session) = existing {
                    session.touch(now);
                    let bytes = encode(&session)?;
                    sessions
                        .insert(session_id, bytes.as_slice())
                        .map_err(io_err)?;
                }
            }

            let entry = calculation.into_entry(id, now);
            let bytes = encode(&entry)?;
            let mut entries = write_txn.open_table(ENTRIES).map_err(io_err)?;
            entries.insert(id, bytes.as_slice()).map_err(io_err)?;

            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(NEXT_ENTRY_ID, next_id).map_err(io_err)?;
            entry
        };
        write_txn.commit().map_err(io_err)?;

        // Update in-memory state only after successful commit.
        self.next_id = next_id;
        Ok(entry)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, CalcError> {
        let limit = clamp_limit(limit);
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;

        let mut entries = Vec::with_capacity(limit.min(64));
        for item in table.iter().map_err(io_err)?.rev().take(limit) {
            let (_, value) = item.map_err(io_err)?;
            entries.push(decode(value.value())?);
        }
        Ok(entries)
    }

    fn clear_all(&mut self) -> Result<usize, CalcError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let removed = {
            let mut table = write_txn.open_table(ENTRIES).map_err(io_err)?;
            let mut ids = Vec::new();
            for item in table.iter().map_err(io_err)? {
                let (key, _) = item.map_err(io_err)?;
                ids.push(key.value());
            }
            for id in &ids {
                table.remove(*id).map_err(io_err)?;
            }
            ids.len()
        };
        write_txn.commit().map_err(io_err)?;

        // Entries are already deleted; a failed compaction is not fatal.
        if let Err(e) = self.compact() {
            tracing::warn!(error = %e, "compaction after clear failed");
        }
        tracing::info!(removed, "cleared calculation history");
        Ok(removed)
    }

    fn create_session(&mut self, session_id: &str) -> Result<SessionStats, CalcError> {
        validate_session_id(session_id)?;
        if let Some(existing) = self.read_session(session_id)? {
            return Ok(existing);
        }

        let session = SessionStats::new(session_id, Utc::now());
        let bytes = encode(&session)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SESSIONS).map_err(io_err)?;
            table
                .insert(session_id, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(session)
    }

    fn session_stats(&self, session_id: &str) -> Result<Option<SessionStats>, CalcError> {
        self.read_session(session_id)
    }

    fn len(&self) -> Result<usize, CalcError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTRIES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
