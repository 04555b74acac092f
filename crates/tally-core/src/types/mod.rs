//! # Core Type Definitions
//!
//! This module contains the small vocabulary shared by the engine, the input
//! layer and the history store:
//! - Keypad values (`Digit`, `Operator`)
//! - Error types (`CalcError`)
//!
//! ## Guarantees
//!
//! - A `Digit` is always in `0..=9`; out-of-range digits are unrepresentable
//! - Operator arithmetic never panics; failures are returned as `CalcError`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::primitives::DISPLAY_LIMIT;

// =============================================================================
// DIGIT
// =============================================================================

/// A single decimal digit entered on the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    /// Create a digit, returning `None` for values above 9.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 9 { Some(Self(value)) } else { None }
    }

    /// Parse an ASCII digit character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(10).map(|d| Self(d as u8))
    }

    /// Get the raw digit value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The character this digit appends to the display.
    #[must_use]
    pub const fn as_char(self) -> char {
        (b'0' + self.0) as char
    }
}

impl TryFrom<u8> for Digit {
    type Error = CalcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| CalcError::UnknownKey(value.to_string()))
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> Self {
        digit.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// OPERATOR
// =============================================================================

/// A binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// All operators in keypad order.
    pub const ALL: [Self; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    /// Symbol used in expression traces and stored history.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
        }
    }

    /// Map a keyboard character to an operator.
    #[must_use]
    pub const fn from_key(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' | '×' => Some(Self::Multiply),
            '/' | '÷' => Some(Self::Divide),
            _ => None,
        }
    }

    /// Recognize an operator token inside a stored expression.
    ///
    /// Accepts the display symbols as well as their ASCII spellings.
    #[must_use]
    pub fn from_symbol(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Self::Add),
            "-" | "−" => Some(Self::Subtract),
            "×" | "*" | "x" => Some(Self::Multiply),
            "÷" | "/" => Some(Self::Divide),
            _ => None,
        }
    }

    /// Evaluate `lhs <op> rhs`.
    ///
    /// # Errors
    ///
    /// - `CalcError::DivideByZero` when dividing by zero
    /// - `CalcError::Overflow` when the magnitude of the result exceeds
    ///   `DISPLAY_LIMIT` or the result is not finite
    pub fn apply(self, lhs: f64, rhs: f64) -> Result<f64, CalcError> {
        let result = match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => {
                if rhs == 0.0 {
                    return Err(CalcError::DivideByZero);
                }
                lhs / rhs
            }
        };

        if !result.is_finite() || result.abs() > DISPLAY_LIMIT {
            return Err(CalcError::Overflow);
        }
        Ok(result)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tally system.
///
/// The engine itself never returns the arithmetic variants to its caller;
/// it converts them into the `"Error"` display and keeps the cause for
/// inspection. Everything else uses `Result<T, CalcError>`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CalcError {
    /// The right-hand operand of a division was zero.
    #[error("Cannot divide by zero")]
    DivideByZero,

    /// The result does not fit on the display.
    #[error("Result too large")]
    Overflow,

    /// A key or key token that has no calculator meaning.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// A calculation record failed validation.
    #[error("Invalid calculation record: {0}")]
    InvalidRecord(String),

    /// The requested session does not exist.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
