//! # Calculator Primitives
//!
//! Hardcoded runtime constants for the Tally CORE.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Largest magnitude a computed result may have and still be displayed.
///
/// Any evaluation whose result exceeds this (in absolute value) fails with
/// `CalcError::Overflow` and puts the engine into the Error display.
pub const DISPLAY_LIMIT: f64 = 999_999_999_999.0;

/// Literal shown on the display after a failed evaluation.
pub const ERROR_DISPLAY: &str = "Error";

/// Display value of a freshly initialized or cleared engine.
pub const ZERO_DISPLAY: &str = "0";

// =============================================================================
// HISTORY LIMITS
// =============================================================================

/// Number of entries returned by a history listing when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Upper bound for any history listing.
///
/// Listings are clamped to this value to keep queries bounded.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Number of most recent entries summarized by `HistoryStats`.
pub const STATS_WINDOW: usize = 1000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for a stored expression string.
pub const MAX_EXPRESSION_LENGTH: usize = 256;

/// Maximum length for a stored result string.
pub const MAX_RESULT_LENGTH: usize = 64;

/// Maximum length for a session identifier.
pub const MAX_SESSION_ID_LENGTH: usize = 64;
