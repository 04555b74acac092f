//! # Display Formatting
//!
//! Conversion between `f64` values and the strings shown on the display.
//!
//! Numbers render in their shortest round-trip decimal form. Very small and
//! very large magnitudes switch to exponent notation so the display stays
//! readable (`1e-7`, `1e+21`).

use crate::primitives::ERROR_DISPLAY;

/// Magnitudes below this (and non-zero) render in exponent form.
const EXPONENT_BELOW: f64 = 1e-6;

/// Magnitudes at or above this render in exponent form.
const EXPONENT_FROM: f64 = 1e21;

/// Render a number for the display.
///
/// Integral values have no fractional part (`16`, not `16.0`), and negative
/// zero renders as `0`.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs();
    if magnitude < EXPONENT_BELOW || magnitude >= EXPONENT_FROM {
        let scientific = format!("{:e}", value);
        // `{:e}` omits the sign of positive exponents.
        return match scientific.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => scientific,
        };
    }

    format!("{}", value)
}

/// Parse the display into a finite number.
///
/// Returns `None` for the error marker, for anything that is not a plain
/// decimal literal, and for literals too large to represent.
#[must_use]
pub fn parse_display(display: &str) -> Option<f64> {
    if display.is_empty() || display == ERROR_DISPLAY {
        return None;
    }
    let numeric = display
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e'));
    if !numeric {
        return None;
    }
    display.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether the display shows the error marker.
#[must_use]
pub fn is_error_display(display: &str) -> bool {
    display == ERROR_DISPLAY
}
