//! # Persistent Storage
//!
//! Disk-backed implementations of the history store.

mod redb_history;

pub use redb_history::RedbHistory;
