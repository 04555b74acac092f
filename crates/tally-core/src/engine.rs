//! # Calculator Engine
//!
//! The input/evaluation state machine.
//!
//! The engine consumes one input event at a time and updates its state
//! synchronously. States are implicit in three fields:
//!
//! | pending operand | pending operator | display   | state   |
//! |-----------------|------------------|-----------|---------|
//! | absent          | absent           | number    | Idle    |
//! | present         | any              | number    | Pending |
//! | absent          | absent           | `"Error"` | Error   |
//!
//! Arithmetic failures never escape: they move the engine into the Error
//! state, which is left by all-clear or by entering a fresh number.
//!
//! A [`HistorySink`] can be attached at construction time. It is notified
//! after each successful evaluation; whatever happens inside the sink has no
//! effect on the engine.

use crate::format::{format_number, is_error_display, parse_display};
use crate::history::HistorySink;
use crate::input::InputEvent;
use crate::primitives::{ERROR_DISPLAY, ZERO_DISPLAY};
use crate::{CalcError, Digit, Operator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Read-only projection of the engine state for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub display: String,
    pub expression: String,
    pub memory: f64,
    pub pending_operator: Option<Operator>,
    pub awaiting_operand: bool,
    /// Why the display shows `"Error"`, if it does.
    pub error: Option<String>,
}

// =============================================================================
// CALCULATOR
// =============================================================================

/// The calculator state machine.
#[derive(Clone)]
pub struct Calculator {
    display: String,
    pending_operand: Option<f64>,
    pending_operator: Option<Operator>,
    awaiting_operand: bool,
    memory: f64,
    expression: String,
    fault: Option<CalcError>,
    sink: Option<Arc<dyn HistorySink>>,
}

impl std::fmt::Debug for Calculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Calculator")
            .field("display", &self.display)
            .field("pending_operand", &self.pending_operand)
            .field("pending_operator", &self.pending_operator)
            .field("awaiting_operand", &self.awaiting_operand)
            .field("memory", &self.memory)
            .field("expression", &self.expression)
            .field("fault", &self.fault)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self {
            display: ZERO_DISPLAY.to_string(),
            pending_operand: None,
            pending_operator: None,
            awaiting_operand: false,
            memory: 0.0,
            expression: String::new(),
            fault: None,
            sink: None,
        }
    }
}

impl Calculator {
    /// Create an engine without history persistence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that reports completed calculations to `sink`.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn HistorySink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Check if a history sink is attached.
    #[must_use]
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    // =========================================================================
    // PROJECTIONS
    // =========================================================================

    /// Current display string.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Trace of the last completed operation (`"8 × 2 ="`), or empty.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Current memory register.
    #[must_use]
    pub fn memory(&self) -> f64 {
        self.memory
    }

    /// Left-hand operand of the calculation in progress.
    #[must_use]
    pub fn pending_operand(&self) -> Option<f64> {
        self.pending_operand
    }

    /// Operator of the calculation in progress.
    #[must_use]
    pub fn pending_operator(&self) -> Option<Operator> {
        self.pending_operator
    }

    /// Whether the next digit starts a new number.
    #[must_use]
    pub fn is_awaiting_operand(&self) -> bool {
        self.awaiting_operand
    }

    /// Cause of the current Error display.
    #[must_use]
    pub fn error(&self) -> Option<&CalcError> {
        self.fault.as_ref()
    }

    /// Whether the engine is in the Error state.
    #[must_use]
    pub fn is_error(&self) -> bool {
        is_error_display(&self.display)
    }

    /// Capture everything a renderer needs.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            display: self.display.clone(),
            expression: self.expression.clone(),
            memory: self.memory,
            pending_operator: self.pending_operator,
            awaiting_operand: self.awaiting_operand,
            error: self.fault.as_ref().map(ToString::to_string),
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Apply one input event.
    ///
    /// Every input source (keys, buttons, scripted sequences) goes through
    /// here, so they all behave identically.
    pub fn dispatch(&mut self, event: InputEvent) {
        match event {
            InputEvent::Digit(d) => self.input_digit(d),
            InputEvent::DecimalPoint => self.input_decimal_point(),
            InputEvent::Operator(op) => self.apply_operator(Some(op)),
            InputEvent::Equals => self.equals(),
            InputEvent::ClearEntry => self.clear_entry(),
            InputEvent::AllClear => self.all_clear(),
            InputEvent::Backspace => self.backspace(),
            InputEvent::MemoryAdd => self.memory_add(),
            InputEvent::MemorySubtract => self.memory_subtract(),
            InputEvent::MemoryRecall => self.memory_recall(),
            InputEvent::MemoryClear => self.memory_clear(),
        }
    }

    /// Apply a sequence of input events in order.
    pub fn dispatch_all(&mut self, events: impl IntoIterator<Item = InputEvent>) {
        for event in events {
            self.dispatch(event);
        }
    }

    // =========================================================================
    // ENTRY
    // =========================================================================

    /// Type a digit.
    pub fn input_digit(&mut self, digit: Digit) {
        if self.awaiting_operand {
            self.display = digit.to_string();
            self.awaiting_operand = false;
        } else if self.display == ZERO_DISPLAY {
            self.display = digit.to_string();
        } else {
            self.display.push(digit.as_char());
        }
        self.fault = None;
    }

    /// Type a decimal point. A second point in the same number is ignored.
    pub fn input_decimal_point(&mut self) {
        if self.awaiting_operand {
            self.display = "0.".to_string();
            self.awaiting_operand = false;
        } else if !self.display.contains('.') {
            self.display.push('.');
        }
        self.fault = None;
    }

    /// Remove the last typed character.
    ///
    /// Does nothing while a result or recalled value is on display.
    pub fn backspace(&mut self) {
        if self.awaiting_operand || self.is_error() {
            return;
        }
        self.display.pop();
        if self.display.is_empty() || self.display == "-" {
            self.display = ZERO_DISPLAY.to_string();
        }
    }

    /// Reset the display only (C).
    pub fn clear_entry(&mut self) {
        self.display = ZERO_DISPLAY.to_string();
        self.fault = None;
    }

    /// Reset everything except memory (AC).
    pub fn all_clear(&mut self) {
        self.display = ZERO_DISPLAY.to_string();
        self.pending_operand = None;
        self.pending_operator = None;
        self.awaiting_operand = false;
        self.expression.clear();
        self.fault = None;
    }

    // =========================================================================
    // EVALUATION
    // =========================================================================

    /// Press an operator key (`Some`) or equals (`None`).
    ///
    /// Completes the pending calculation if there is one, then records
    /// `next` as the new pending operator. A failed evaluation leaves the
    /// engine in the Error state and drops `next`.
    pub fn apply_operator(&mut self, next: Option<Operator>) {
        if self.is_error() {
            // Operators cannot restart a broken chain.
            let fault = self.fault.clone().unwrap_or(CalcError::Overflow);
            self.fail(fault);
            return;
        }

        let Some(input_value) = parse_display(&self.display) else {
            self.fail(CalcError::Overflow);
            return;
        };

        match (self.pending_operand, self.pending_operator) {
            (None, _) => {
                self.pending_operand = Some(input_value);
            }
            (Some(lhs), Some(op)) => match op.apply(lhs, input_value) {
                Ok(result) => self.complete(lhs, op, input_value, result),
                Err(e) => {
                    tracing::debug!(
                        lhs,
                        rhs = input_value,
                        operator = %op,
                        error = %e,
                        "evaluation failed"
                    );
                    self.fail(e);
                    return;
                }
            },
            (Some(_), None) => {}
        }

        self.awaiting_operand = true;
        self.pending_operator = next;
    }

    /// Press equals.
    pub fn equals(&mut self) {
        self.apply_operator(None);
    }

    /// Record a successful evaluation.
    fn complete(&mut self, lhs: f64, op: Operator, rhs: f64, result: f64) {
        let expression = format!("{} {} {}", format_number(lhs), op, format_number(rhs));
        let result_text = format_number(result);

        self.display = result_text.clone();
        self.pending_operand = Some(result);
        self.expression = format!("{} =", expression);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record_calculation(&expression, &result_text) {
                tracing::warn!(
                    expression = %expression,
                    error = %e,
                    "history sink dropped calculation"
                );
            }
        }
    }

    /// Enter the Error state.
    fn fail(&mut self, fault: CalcError) {
        self.display = ERROR_DISPLAY.to_string();
        self.pending_operand = None;
        self.pending_operator = None;
        self.awaiting_operand = true;
        self.fault = Some(fault);
    }

    // =========================================================================
    // MEMORY
    // =========================================================================

    /// M+: add the displayed number to memory.
    pub fn memory_add(&mut self) {
        self.adjust_memory(1.0);
    }

    /// M-: subtract the displayed number from memory.
    pub fn memory_subtract(&mut self) {
        self.adjust_memory(-1.0);
    }

    /// Memory stays finite: a sum that would not be leaves memory as it was
    /// and enters Error with `Overflow`.
    fn adjust_memory(&mut self, sign: f64) {
        let Some(value) = parse_display(&self.display) else {
            return;
        };
        let updated = self.memory + sign * value;
        if updated.is_finite() {
            self.memory = updated;
        } else {
            tracing::debug!(memory = self.memory, value, "memory overflow");
            self.fail(CalcError::Overflow);
        }
    }

    /// MR: show memory; the next digit starts a new number.
    pub fn memory_recall(&mut self) {
        self.display = format_number(self.memory);
        self.awaiting_operand = true;
        self.fault = None;
    }

    /// MC: reset memory to zero.
    pub fn memory_clear(&mut self) {
        self.memory = 0.0;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn digit(d: u8) -> Digit {
        Digit::new(d).expect("valid digit")
    }

    fn type_number(calc: &mut Calculator, text: &str) {
        for c in text.chars() {
            match c {
                '.' => calc.input_decimal_point(),
                _ => calc.input_digit(Digit::from_char(c).expect("digit char")),
            }
        }
    }

    /// Sink that remembers every notification.
    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl HistorySink for RecordingSink {
        fn record_calculation(&self, expression: &str, result: &str) -> Result<(), CalcError> {
            self.calls
                .lock()
                .map_err(|e| CalcError::IoError(e.to_string()))?
                .push((expression.to_string(), result.to_string()));
            Ok(())
        }
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    /// Sink that always fails.
    struct BrokenSink;

    impl HistorySink for BrokenSink {
        fn record_calculation(&self, _: &str, _: &str) -> Result<(), CalcError> {
            Err(CalcError::IoError("history service unreachable".to_string()))
        }
    }

    // =========================================================================
    // Entry
    // =========================================================================

    #[test]
    fn starts_at_zero() {
        let calc = Calculator::new();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.expression(), "");
        assert_eq!(calc.memory(), 0.0);
        assert!(calc.pending_operand().is_none());
        assert!(calc.pending_operator().is_none());
        assert!(!calc.is_awaiting_operand());
        assert!(!calc.has_sink());
    }

    #[test]
    fn leading_zero_replaced() {
        let mut calc = Calculator::new();
        calc.input_digit(digit(0));
        calc.input_digit(digit(0));
        assert_eq!(calc.display(), "0");
        calc.input_digit(digit(7));
        assert_eq!(calc.display(), "7");
        calc.input_digit(digit(0));
        assert_eq!(calc.display(), "70");
    }

    #[test]
    fn decimal_point_once_per_number() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "3.1.4");
        assert_eq!(calc.display(), "3.14");
    }

    #[test]
    fn decimal_point_on_zero_keeps_zero() {
        let mut calc = Calculator::new();
        calc.input_decimal_point();
        calc.input_digit(digit(5));
        assert_eq!(calc.display(), "0.5");
    }

    #[test]
    fn decimal_point_twice_after_operator() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "4");
        calc.apply_operator(Some(Operator::Add));
        calc.input_decimal_point();
        let once = calc.display().to_string();
        calc.input_decimal_point();
        assert_eq!(once, "0.");
        assert_eq!(calc.display(), "0.");
    }

    #[test]
    fn backspace_removes_last_char() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "123");
        calc.backspace();
        assert_eq!(calc.display(), "12");
        calc.backspace();
        calc.backspace();
        assert_eq!(calc.display(), "0");
        calc.backspace();
        assert_eq!(calc.display(), "0");
    }

    #[test]
    fn backspace_ignored_on_result() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "12");
        calc.apply_operator(Some(Operator::Subtract));
        type_number(&mut calc, "20");
        calc.equals();
        assert_eq!(calc.display(), "-8");
        calc.backspace();
        assert_eq!(calc.display(), "-8");
    }

    #[test]
    fn clear_entry_keeps_pending() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "5");
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "9");
        calc.clear_entry();
        assert_eq!(calc.display(), "0");
        assert_eq!(calc.pending_operand(), Some(5.0));
        assert_eq!(calc.pending_operator(), Some(Operator::Add));

        type_number(&mut calc, "3");
        calc.equals();
        assert_eq!(calc.display(), "8");
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    #[test]
    fn first_operator_captures_operand() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "42");
        calc.apply_operator(Some(Operator::Multiply));

        assert_eq!(calc.display(), "42");
        assert_eq!(calc.pending_operand(), Some(42.0));
        assert_eq!(calc.pending_operator(), Some(Operator::Multiply));
        assert!(calc.is_awaiting_operand());
        assert_eq!(calc.expression(), "");
    }

    #[test]
    fn chained_evaluation() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "5");
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "3");
        calc.apply_operator(Some(Operator::Multiply));
        assert_eq!(calc.display(), "8");
        assert_eq!(calc.expression(), "5 + 3 =");

        type_number(&mut calc, "2");
        calc.equals();
        assert_eq!(calc.display(), "16");
        assert_eq!(calc.expression(), "8 × 2 =");
        assert!(calc.pending_operator().is_none());
        assert_eq!(calc.pending_operand(), Some(16.0));
    }

    #[test]
    fn equals_after_equals_keeps_result() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "6");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "4");
        calc.equals();
        assert_eq!(calc.display(), "1.5");
        calc.equals();
        assert_eq!(calc.display(), "1.5");
        assert_eq!(calc.expression(), "6 ÷ 4 =");
    }

    #[test]
    fn operator_after_equals_continues_from_result() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "2");
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "2");
        calc.equals();
        calc.apply_operator(Some(Operator::Multiply));
        type_number(&mut calc, "10");
        calc.equals();
        assert_eq!(calc.display(), "40");
        assert_eq!(calc.expression(), "4 × 10 =");
    }

    #[test]
    fn negative_results_and_fractions() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Subtract));
        type_number(&mut calc, "2.5");
        calc.equals();
        assert_eq!(calc.display(), "-1.5");
        assert_eq!(calc.expression(), "1 - 2.5 =");
    }

    #[test]
    fn divide_by_zero_enters_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "9");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        assert_eq!(calc.display(), "Error");
        assert!(calc.is_error());
        assert_eq!(calc.error(), Some(&CalcError::DivideByZero));
        assert!(calc.pending_operand().is_none());
        assert!(calc.pending_operator().is_none());
        assert!(calc.is_awaiting_operand());
    }

    #[test]
    fn overflow_enters_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "999999999999");
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "1");
        calc.equals();
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.error(), Some(&CalcError::Overflow));
    }

    #[test]
    fn failure_drops_next_operator() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.apply_operator(Some(Operator::Add));
        assert_eq!(calc.display(), "Error");
        assert!(calc.pending_operator().is_none());
    }

    #[test]
    fn operators_in_error_state_stay_in_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        for op in Operator::ALL {
            calc.apply_operator(Some(op));
            calc.equals();
        }
        assert_eq!(calc.display(), "Error");
        assert!(calc.pending_operand().is_none());
        assert_eq!(calc.error(), Some(&CalcError::DivideByZero));
    }

    #[test]
    fn digit_recovers_from_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        type_number(&mut calc, "7");
        assert_eq!(calc.display(), "7");
        assert!(calc.error().is_none());

        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "1");
        calc.equals();
        assert_eq!(calc.display(), "8");
    }

    #[test]
    fn all_clear_recovers_from_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();
        calc.all_clear();

        assert_eq!(calc.display(), "0");
        assert!(!calc.is_error());
        assert!(calc.error().is_none());
        assert!(!calc.is_awaiting_operand());
    }

    #[test]
    fn unrepresentable_input_is_overflow() {
        let mut calc = Calculator::new();
        type_number(&mut calc, &"9".repeat(400));
        calc.apply_operator(Some(Operator::Add));
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.error(), Some(&CalcError::Overflow));
    }

    #[test]
    fn all_clear_resets_everything_but_memory() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "7");
        calc.memory_add();
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "2");
        calc.equals();

        calc.all_clear();
        assert_eq!(calc.display(), "0");
        assert!(calc.pending_operand().is_none());
        assert!(calc.pending_operator().is_none());
        assert!(!calc.is_awaiting_operand());
        assert_eq!(calc.expression(), "");
        assert_eq!(calc.memory(), 7.0);
    }

    // =========================================================================
    // Memory
    // =========================================================================

    #[test]
    fn memory_round_trip() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "7");
        calc.memory_add();
        calc.clear_entry();
        type_number(&mut calc, "3");
        calc.memory_add();
        calc.all_clear();

        calc.memory_recall();
        assert_eq!(calc.display(), "10");
        assert!(calc.is_awaiting_operand());

        calc.memory_clear();
        assert_eq!(calc.memory(), 0.0);
    }

    #[test]
    fn memory_subtract_goes_negative() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "4.5");
        calc.memory_subtract();
        calc.memory_recall();
        assert_eq!(calc.display(), "-4.5");
    }

    #[test]
    fn memory_recall_then_digit_starts_new_number() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "12");
        calc.memory_add();
        calc.memory_recall();
        type_number(&mut calc, "3");
        assert_eq!(calc.display(), "3");
    }

    #[test]
    fn memory_ignores_error_display() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "5");
        calc.memory_add();
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        calc.memory_add();
        calc.memory_subtract();
        assert_eq!(calc.memory(), 5.0);
    }

    #[test]
    fn memory_recall_clears_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "2");
        calc.memory_add();
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        calc.memory_recall();
        assert_eq!(calc.display(), "2");
        assert!(calc.error().is_none());
    }

    #[test]
    fn memory_overflow_enters_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, &"9".repeat(308));
        calc.memory_add();
        let stored = calc.memory();
        assert!(stored.is_finite());

        calc.memory_add();
        assert_eq!(calc.display(), "Error");
        assert_eq!(calc.error(), Some(&CalcError::Overflow));
        assert_eq!(calc.memory(), stored);

        calc.memory_recall();
        assert_ne!(calc.display(), "Infinity");
        assert!(parse_display(calc.display()).is_some());
    }

    #[test]
    fn memory_subtract_overflow_enters_error() {
        let mut calc = Calculator::new();
        type_number(&mut calc, &"9".repeat(308));
        calc.memory_subtract();
        calc.memory_subtract();
        assert!(calc.is_error());
        assert!(calc.memory().is_finite());
    }

    // =========================================================================
    // History sink
    // =========================================================================

    #[test]
    fn sink_receives_each_evaluation() {
        let sink = Arc::new(RecordingSink::default());
        let mut calc = Calculator::with_sink(sink.clone());
        assert!(calc.has_sink());

        type_number(&mut calc, "5");
        calc.apply_operator(Some(Operator::Add));
        type_number(&mut calc, "3");
        calc.apply_operator(Some(Operator::Multiply));
        type_number(&mut calc, "2");
        calc.equals();

        assert_eq!(
            sink.calls(),
            vec![
                ("5 + 3".to_string(), "8".to_string()),
                ("8 × 2".to_string(), "16".to_string()),
            ]
        );
    }

    #[test]
    fn sink_not_called_on_failure() {
        let sink = Arc::new(RecordingSink::default());
        let mut calc = Calculator::with_sink(sink.clone());

        type_number(&mut calc, "1");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        assert!(sink.calls().is_empty());
    }

    #[test]
    fn broken_sink_does_not_affect_state() {
        let mut with_sink = Calculator::with_sink(Arc::new(BrokenSink));
        let mut without = Calculator::new();

        for calc in [&mut with_sink, &mut without] {
            type_number(calc, "5");
            calc.apply_operator(Some(Operator::Add));
            type_number(calc, "3");
            calc.equals();
        }

        assert_eq!(with_sink.snapshot(), without.snapshot());
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn dispatch_matches_direct_calls() {
        let events = [
            InputEvent::Digit(digit(1)),
            InputEvent::Digit(digit(2)),
            InputEvent::Operator(Operator::Divide),
            InputEvent::Digit(digit(4)),
            InputEvent::Equals,
            InputEvent::MemoryAdd,
        ];
        let mut dispatched = Calculator::new();
        dispatched.dispatch_all(events);

        let mut direct = Calculator::new();
        direct.input_digit(digit(1));
        direct.input_digit(digit(2));
        direct.apply_operator(Some(Operator::Divide));
        direct.input_digit(digit(4));
        direct.equals();
        direct.memory_add();

        assert_eq!(dispatched.snapshot(), direct.snapshot());
        assert_eq!(dispatched.display(), "3");
        assert_eq!(dispatched.memory(), 3.0);
    }

    #[test]
    fn snapshot_reports_error_reason() {
        let mut calc = Calculator::new();
        type_number(&mut calc, "3");
        calc.apply_operator(Some(Operator::Divide));
        type_number(&mut calc, "0");
        calc.equals();

        let snapshot = calc.snapshot();
        assert_eq!(snapshot.display, "Error");
        assert_eq!(snapshot.error.as_deref(), Some("Cannot divide by zero"));
    }
}
