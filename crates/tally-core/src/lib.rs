//! # tally-core
//!
//! The calculator engine for Tally - THE LOGIC.
//!
//! This crate implements the input/evaluation state machine of a four
//! function calculator with a memory register, plus the history model
//! shared by front ends and the history service.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Processes one input event at a time, synchronously
//! - Never surfaces arithmetic failures to its caller; they become the
//!   `"Error"` display
//! - Never depends on a history sink being present or healthy
//! - Has NO async, NO network dependencies (pure Rust)
//!
//! ## Example
//!
//! ```
//! use tally_core::{Calculator, parse_keys};
//!
//! let mut calc = Calculator::new();
//! calc.dispatch_all(parse_keys("5+3*2=").expect("valid keys"));
//! assert_eq!(calc.display(), "16");
//! assert_eq!(calc.expression(), "8 × 2 =");
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod engine;
pub mod format;
pub mod history;
pub mod input;
pub mod primitives;
pub mod storage;
pub mod theme;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CalcError, Digit, Operator};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use engine::{Calculator, Snapshot};
pub use format::{format_number, parse_display};
pub use input::{InputEvent, Key, map_key, parse_keys};
pub use theme::Theme;

// =============================================================================
// RE-EXPORTS: History
// =============================================================================

pub use backend::{BackendKind, HistoryBackend};
pub use history::{
    DateRange, HistoryEntry, HistorySink, HistoryStats, HistoryStore, MemoryHistory,
    NewCalculation, OperationCounts, SessionStats,
};
pub use storage::RedbHistory;
