//! # Input Events
//!
//! The discrete events the engine understands, and the mapping from
//! keyboard input onto them.
//!
//! Key sequences are the textual form used by the REPL and `tally eval`:
//! whitespace-separated tokens, where a token is either a named command
//! (`ac`, `ce`, `back`, `mc`, `mr`, `m+`, `m-`, `enter`, `esc`) or a run of
//! single-character keys (`12.5*4=`).

use crate::{CalcError, Digit, Operator};
use serde::{Deserialize, Serialize};

/// One calculator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum InputEvent {
    Digit(Digit),
    DecimalPoint,
    Operator(Operator),
    Equals,
    ClearEntry,
    AllClear,
    Backspace,
    MemoryAdd,
    MemorySubtract,
    MemoryRecall,
    MemoryClear,
}

/// A key press, independent of the terminal or toolkit that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
}

/// Map a key press to an input event.
///
/// Returns `None` for keys with no calculator meaning.
#[must_use]
pub fn map_key(key: Key) -> Option<InputEvent> {
    match key {
        Key::Enter => Some(InputEvent::Equals),
        Key::Escape => Some(InputEvent::AllClear),
        Key::Backspace => Some(InputEvent::Backspace),
        Key::Delete => Some(InputEvent::ClearEntry),
        Key::Char(c) => {
            if let Some(d) = Digit::from_char(c) {
                return Some(InputEvent::Digit(d));
            }
            if let Some(op) = Operator::from_key(c) {
                return Some(InputEvent::Operator(op));
            }
            match c {
                '.' => Some(InputEvent::DecimalPoint),
                '=' | '\n' | '\r' => Some(InputEvent::Equals),
                'c' | 'C' => Some(InputEvent::ClearEntry),
                'a' | 'A' => Some(InputEvent::AllClear),
                _ => None,
            }
        }
    }
}

/// Map a named command token.
fn named_command(token: &str) -> Option<InputEvent> {
    let event = match token.to_ascii_lowercase().as_str() {
        "ac" | "esc" | "escape" => InputEvent::AllClear,
        "ce" | "del" | "delete" => InputEvent::ClearEntry,
        "back" | "bs" | "backspace" => InputEvent::Backspace,
        "enter" => InputEvent::Equals,
        "mc" => InputEvent::MemoryClear,
        "mr" => InputEvent::MemoryRecall,
        "m+" => InputEvent::MemoryAdd,
        "m-" => InputEvent::MemorySubtract,
        _ => return None,
    };
    Some(event)
}

/// Parse a key sequence into events.
///
/// # Errors
///
/// Returns `CalcError::UnknownKey` for the first character that maps to no
/// event.
pub fn parse_keys(input: &str) -> Result<Vec<InputEvent>, CalcError> {
    let mut events = Vec::new();
    for token in input.split_whitespace() {
        if let Some(event) = named_command(token) {
            events.push(event);
            continue;
        }
        for c in token.chars() {
            let event = map_key(Key::Char(c)).ok_or_else(|| CalcError::UnknownKey(c.to_string()))?;
            events.push(event);
        }
    }
    Ok(events)
}
