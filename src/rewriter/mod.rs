/*
    This module rewrites axioms by repeated rule substitution
*/

use rand::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::error_handling::*;
use crate::grammar::*;
use crate::history::{HistoryRecord, HistoryRecorder};

#[derive(Debug, PartialEq, Error)]
pub enum ProcessErrorType {
    #[error("Invalid number of iterations `{0}`: expected a non-negative integer")]
    InvalidIterations(i64),
    #[error("Failed to record history: {0}")]
    History(IoError),
}

impl ErrorType for ProcessErrorType {}

pub type ProcessError = Error<ProcessErrorType>;
pub type ProcessResult = Result<String, ProcessError>;

// One round of simultaneous rewriting: every symbol is replaced based on
// `current` alone, never on output written earlier in the same round
fn rewrite_round<R: Rng + ?Sized>(grammar: &Grammar, current: &str, rng: &mut R) -> String {
    let mut next = String::with_capacity(current.len());

    for symbol in current.chars() {
        match grammar.production(symbol) {
            Some(Production::Deterministic(outcome)) => next.push_str(outcome),
            // Sampled again for every occurrence
            Some(Production::Stochastic(alternatives)) => next.push_str(alternatives.choose(rng)),
            None => next.push(symbol),
        }
    }

    return next;
}

/// Applies `rounds` rounds of rewriting to the axiom.
///
/// Deterministic grammars ignore `rng` entirely, so the result is a pure
/// function of `rounds`.
pub fn rewrite<R: Rng + ?Sized>(grammar: &Grammar, rounds: usize, rng: &mut R) -> String {
    let mut current = grammar.axiom().to_string();

    for round in 1..=rounds {
        current = rewrite_round(grammar, &current, rng);
        debug!(round, length = current.len(), "rewrote axiom");
    }

    return current;
}

/// Runs rewrites and reports drawable results to a history recorder.
///
/// Stochastic rules draw from the thread-local generator unless another one
/// is supplied through [`Rewriter::with_rng`].
pub struct Rewriter<H, R = ThreadRng> {
    history: H,
    rng: R,
}

impl<H: HistoryRecorder> Rewriter<H> {
    pub fn new(history: H) -> Self {
        Rewriter {
            history,
            rng: thread_rng(),
        }
    }
}

impl<H: HistoryRecorder, R: Rng> Rewriter<H, R> {
    pub fn with_rng(history: H, rng: R) -> Self {
        Rewriter { history, rng }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn into_history(self) -> H {
        self.history
    }

    pub fn process(&mut self, grammar: &Grammar, iterations: i64) -> ProcessResult {
        let error = |error| ProcessError::new(grammar.source().clone(), error);

        let rounds = usize::try_from(iterations)
            .map_err(|_| error(ProcessErrorType::InvalidIterations(iterations)))?;

        let result = rewrite(grammar, rounds, &mut self.rng);

        if grammar.is_drawable() {
            let record = HistoryRecord::new(grammar, rounds as u64, &result);
            self.history
                .record(&record)
                .map_err(|e| error(ProcessErrorType::History(e.into())))?;
        }

        return Ok(result);
    }
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use serde_json::{json, Value};

    use super::*;
    use crate::history::{MemoryHistory, NoHistory};
    use crate::parser::{grammar_from_value, parse_file};

    fn algae() -> Grammar {
        grammar_from_value(&json!({
            "variables": ["A", "B"],
            "constants": [],
            "axiom": "A",
            "rules": {"A": "AB", "B": "A"}
        })).unwrap()
    }

    fn drawable() -> Grammar {
        grammar_from_value(&json!({
            "variables": ["F"],
            "constants": ["+"],
            "axiom": "F",
            "rules": {"F": "F+F"},
            "translations": {"F": "draw 10", "+": "angle 90"}
        })).unwrap()
    }

    fn coin(rules: Value) -> Grammar {
        grammar_from_value(&json!({
            "variables": ["A", "B"],
            "constants": [],
            "axiom": "A",
            "rules": rules
        })).unwrap()
    }

    #[test]
    fn zero_iterations_return_axiom() {
        let mut rewriter = Rewriter::new(NoHistory);
        assert_eq!(rewriter.process(&algae(), 0), Ok("A".to_string()));
        assert_eq!(rewriter.process(&drawable(), 0), Ok("F".to_string()));
    }

    #[test]
    fn deterministic_golden_strings() {
        let grammar = parse_file("example_data/algae.json").unwrap();
        assert!(!grammar.is_drawable());

        let mut rewriter = Rewriter::new(NoHistory);
        let answers = vec!["A", "AB", "ABA", "ABAAB", "ABAABABA", "ABAABABAABAAB"];

        for (iterations, answer) in zip(0.., answers) {
            assert_eq!(rewriter.process(&grammar, iterations).unwrap(), answer);
        }
    }

    #[test]
    fn deterministic_results_are_reproducible() {
        let grammar = drawable();
        let mut rewriter = Rewriter::new(NoHistory);
        let first = rewriter.process(&grammar, 6).unwrap();

        for _ in 0..5 {
            assert_eq!(rewriter.process(&grammar, 6).unwrap(), first);
        }
        // Every round doubles the F's and adds one + per F
        assert_eq!(first.chars().filter(|c| *c == 'F').count(), 64);
        assert_eq!(first.len(), 127);
    }

    #[test]
    fn constants_pass_through() {
        let grammar = drawable();
        assert_eq!(rewrite(&grammar, 2, &mut thread_rng()), "F+F+F+F");
    }

    #[test]
    fn negative_iterations_rejected() {
        let mut rewriter = Rewriter::new(MemoryHistory::new());

        for grammar in [algae(), drawable()] {
            let error = rewriter.process(&grammar, -1).unwrap_err();
            assert_eq!(error.error, ProcessErrorType::InvalidIterations(-1));
            assert_eq!(error.location, *grammar.source());
        }
        assert!(rewriter.history().records.is_empty());
    }

    #[test]
    fn stochastic_outcomes_follow_weights() {
        let grammar = coin(json!({"A": [[0.5, "ABA"], [0.5, "BAB"]], "B": "B"}));
        let mut rewriter = Rewriter::with_rng(NoHistory, StdRng::seed_from_u64(2024));

        let samples = 10_000;
        let heads = (0..samples)
            .filter(|_| rewriter.process(&grammar, 1).unwrap() == "ABA")
            .count();

        let share = heads as f64 / samples as f64;
        assert!((0.45..=0.55).contains(&share), "{}", share);
    }

    #[test]
    fn stochastic_weights_are_relative() {
        let grammar = coin(json!({"A": [[1, "A"], [3, "B"]], "B": "B"}));
        let mut rng = StdRng::seed_from_u64(11);

        let samples = 10_000;
        let bs = (0..samples)
            .filter(|_| rewrite(&grammar, 1, &mut rng) == "B")
            .count();

        let share = bs as f64 / samples as f64;
        assert!((0.70..=0.80).contains(&share), "{}", share);
    }

    #[test]
    fn stochastic_rules_sample_every_occurrence() {
        // A single draw per round would turn every A into the same symbol
        let grammar = grammar_from_value(&json!({
            "variables": ["A", "B"],
            "constants": ["X", "Y"],
            "axiom": "A".repeat(200),
            "rules": {"A": [[0.5, "X"], [0.5, "Y"]], "B": "B"}
        })).unwrap();

        let result = rewrite(&grammar, 1, &mut StdRng::seed_from_u64(5));
        assert_eq!(result.len(), 200);
        assert!(result.contains('X'));
        assert!(result.contains('Y'));
    }

    #[test]
    fn seeded_rewrites_repeat() {
        let grammar = coin(json!({"A": [[0.5, "AB"], [0.5, "BA"]], "B": [[0.2, "A"], [0.8, "BB"]]}));

        let first = rewrite(&grammar, 8, &mut StdRng::seed_from_u64(99));
        let second = rewrite(&grammar, 8, &mut StdRng::seed_from_u64(99));
        assert_eq!(first, second);
    }

    #[test]
    fn drawable_results_are_recorded() {
        let mut rewriter = Rewriter::new(MemoryHistory::new());

        let first = rewriter.process(&drawable(), 1).unwrap();
        let second = rewriter.process(&drawable(), 3).unwrap();
        rewriter.process(&algae(), 3).unwrap();

        let records = &rewriter.history().records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].result, first);
        assert_eq!(records[1].result, second);
        assert_eq!(records[1].iterations, 3);
    }

    #[test]
    fn file_history_last_field_matches_result() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("history.txt");
        let mut rewriter = Rewriter::new(crate::history::FileHistory::new(&path));

        for iterations in 0..4 {
            let result = rewriter.process(&drawable(), iterations).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            let last_line = text.lines().last().unwrap();

            assert_eq!(last_line.split('\t').last().unwrap(), result);
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }

    #[test]
    fn history_failure_surfaces() {
        let directory = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let mut rewriter = Rewriter::new(crate::history::FileHistory::new(directory.path()));

        let error = rewriter.process(&drawable(), 1).unwrap_err();
        assert!(matches!(error.error, ProcessErrorType::History(_)));
    }
}
