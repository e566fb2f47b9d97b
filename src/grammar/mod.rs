/*
    This module is for storing and querying validated L-system grammars
*/

pub mod operation;

use std::collections::HashMap;
use std::fmt::Debug;

use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

use crate::error_handling::Location;
pub use operation::{Color, NamedColor, Operation};

// A single character of the grammar's alphabet
pub type Symbol = char;

pub const DEFAULT_WIDTH: u32 = 1;

// Weighted outcomes of a stochastic production, sampled by binary search
// over the cumulative weights
#[derive(Clone)]
pub struct Alternatives {
    outcomes: Vec<(f64, String)>,
    index: WeightedIndex<f64>,
}

impl Alternatives {
    pub fn new(outcomes: Vec<(f64, String)>) -> Result<Self, WeightedError> {
        let index = WeightedIndex::new(outcomes.iter().map(|(weight, _)| *weight))?;
        Ok(Alternatives { outcomes, index })
    }

    pub fn outcomes(&self) -> &[(f64, String)] {
        &self.outcomes
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.outcomes[self.index.sample(rng)].1
    }
}

impl Debug for Alternatives {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.outcomes.iter()).finish()
    }
}

impl PartialEq for Alternatives {
    fn eq(&self, other: &Self) -> bool {
        self.outcomes == other.outcomes
    }
}

// The right hand side of a rule
#[derive(Debug, Clone, PartialEq)]
pub enum Production {
    Deterministic(String),
    Stochastic(Alternatives),
}

impl Production {
    // Every string this production can write
    pub fn outcomes(&self) -> Vec<&str> {
        match self {
            Production::Deterministic(outcome) => vec![outcome.as_str()],
            Production::Stochastic(alternatives) => alternatives
                .outcomes()
                .iter()
                .map(|(_, outcome)| outcome.as_str())
                .collect(),
        }
    }
}

// Operation table plus pen width; only drawable grammars carry one
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    operations: HashMap<Symbol, Operation>,
    width: u32,
}

impl Drawing {
    pub fn new(operations: HashMap<Symbol, Operation>, width: u32) -> Self {
        Drawing { operations, width }
    }

    pub fn operation(&self, symbol: Symbol) -> Option<&Operation> {
        self.operations.get(&symbol)
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

/// A validated L-system.
///
/// Only the config parser builds these, so every instance satisfies the
/// alphabet invariants: variables and constants are disjoint, every variable
/// has exactly one production, every produced symbol is in the alphabet and
/// the operation table (when present) covers the alphabet exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    source: Location,
    variables: Vec<Symbol>,
    constants: Vec<Symbol>,
    axiom: String,
    rules: HashMap<Symbol, Production>,
    drawing: Option<Drawing>,
}

impl Grammar {
    pub(crate) fn new(
        source: Location,
        variables: Vec<Symbol>,
        constants: Vec<Symbol>,
        axiom: String,
        rules: HashMap<Symbol, Production>,
        drawing: Option<Drawing>,
    ) -> Self {
        Grammar {
            source,
            variables,
            constants,
            axiom,
            rules,
            drawing,
        }
    }

    // Where the grammar was loaded from, used to locate errors
    pub fn source(&self) -> &Location {
        &self.source
    }

    pub fn variables(&self) -> &[Symbol] {
        &self.variables
    }

    pub fn constants(&self) -> &[Symbol] {
        &self.constants
    }

    // Variables first, then constants, in declaration order
    pub fn alphabet(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.variables.iter().chain(self.constants.iter()).copied()
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.variables.contains(&symbol) || self.constants.contains(&symbol)
    }

    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    pub fn production(&self, symbol: Symbol) -> Option<&Production> {
        self.rules.get(&symbol)
    }

    pub fn drawing(&self) -> Option<&Drawing> {
        self.drawing.as_ref()
    }

    pub fn is_drawable(&self) -> bool {
        self.drawing.is_some()
    }

    pub fn is_stochastic(&self) -> bool {
        self.rules
            .values()
            .any(|production| matches!(production, Production::Stochastic(_)))
    }
}
