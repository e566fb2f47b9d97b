use std::collections::HashSet;

use itertools::Itertools;

use crate::grammar::Symbol;
use super::ConfigErrorType::*;
use super::{RawProduction, RawRules, Result, SymbolSite};

pub type Alphabet = HashSet<Symbol>;

// Key sets differ in either direction: (symbols without a key, keys without a symbol)
fn key_mismatch<'a>(keys: impl Iterator<Item = &'a String>, symbols: &[Symbol]) -> Option<(Vec<String>, Vec<String>)> {
    let keys: HashSet<&str> = keys.map(String::as_str).collect();
    let symbols: HashSet<String> = symbols.iter().map(Symbol::to_string).collect();

    let missing = symbols.iter()
        .filter(|symbol| !keys.contains(symbol.as_str()))
        .cloned()
        .sorted()
        .collect_vec();
    let extra = keys.iter()
        .filter(|key| !symbols.contains(**key))
        .map(|key| key.to_string())
        .sorted()
        .collect_vec();

    if missing.is_empty() && extra.is_empty() {
        None
    } else {
        Some((missing, extra))
    }
}

fn first_undefined(text: &str, alphabet: &Alphabet) -> Option<Symbol> {
    text.chars().find(|symbol| !alphabet.contains(symbol))
}

pub fn verify_variables_present(variables: &[Symbol]) -> Result<()> {
    if variables.is_empty() {
        return Err(NoVariables);
    }
    Ok(())
}

pub fn verify_axiom_defined(axiom: &str, alphabet: &Alphabet) -> Result<()> {
    match first_undefined(axiom, alphabet) {
        Some(symbol) => Err(UndefinedSymbol { symbol, site: SymbolSite::Axiom }),
        None => Ok(())
    }
}

pub fn verify_axiom_rewritable(axiom: &str, variables: &[Symbol]) -> Result<()> {
    if !axiom.chars().any(|symbol| variables.contains(&symbol)) {
        return Err(FixedAxiom);
    }
    Ok(())
}

pub fn verify_rule_keys(rules: &RawRules, variables: &[Symbol]) -> Result<()> {
    match key_mismatch(rules.iter().map(|(key, _)| key), variables) {
        Some((missing, extra)) => Err(RuleVariableMismatch { missing, extra }),
        None => Ok(())
    }
}

pub fn verify_rule_outputs(rules: &RawRules, alphabet: &Alphabet) -> Result<()> {
    for (key, production) in rules {
        let outcomes = match production {
            RawProduction::Deterministic(outcome) => vec![outcome],
            RawProduction::Stochastic(alternatives) => alternatives.iter().map(|(_, outcome)| outcome).collect_vec()
        };

        // Keys are verified to be single variables by now
        let variable = key.chars().next().unwrap_or_default();
        if let Some(symbol) = outcomes.into_iter().find_map(|outcome| first_undefined(outcome, alphabet)) {
            return Err(UndefinedSymbol { symbol, site: SymbolSite::Rule(variable) });
        }
    }
    Ok(())
}

pub fn verify_disjoint(variables: &[Symbol], constants: &[Symbol]) -> Result<()> {
    let shared = variables.iter()
        .filter(|symbol| constants.contains(symbol))
        .copied()
        .collect_vec();

    if !shared.is_empty() {
        return Err(VariableConstantOverlap(shared));
    }
    Ok(())
}

pub fn verify_translation_keys<'a>(keys: impl Iterator<Item = &'a String>, alphabet: &[Symbol]) -> Result<()> {
    match key_mismatch(keys, alphabet) {
        Some((missing, extra)) => Err(TranslationAlphabetMismatch { missing, extra }),
        None => Ok(())
    }
}
