/*
    This module validates L-system descriptions into grammars
*/

mod lexer;
mod verifier;

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::error_handling::*;
use crate::grammar::*;
use verifier::*;

pub const BASE_FIELDS: [&str; 4] = ["variables", "constants", "axiom", "rules"];

// Document fields whose JSON type is checked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Variables,
    Constants,
    Axiom,
    Rules,
    Translations,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Variables => "variables",
            Field::Constants => "constants",
            Field::Axiom => "axiom",
            Field::Rules => "rules",
            Field::Translations => "translations",
        }
    }

    pub fn expected(self) -> &'static str {
        match self {
            Field::Variables | Field::Constants => "a list of single-character strings",
            Field::Axiom => "a string",
            Field::Rules => "an object mapping symbols to a string or a non-empty list of [positive weight, string] pairs",
            Field::Translations => "an object mapping symbols to operation strings",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

// Where an undefined symbol was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolSite {
    Axiom,
    Rule(Symbol),
}

impl Display for SymbolSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolSite::Axiom => write!(f, "the axiom"),
            SymbolSite::Rule(variable) => write!(f, "the rule for `{}`", variable),
        }
    }
}

#[derive(Debug, PartialEq, Error)]
pub enum ConfigErrorType {
    #[error("Missing base L-system field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Invalid `{0}`: expected {}", .0.expected())]
    InvalidType(Field),
    #[error("At least one variable must be defined")]
    NoVariables,
    #[error("Undefined symbol `{symbol}` in {site}")]
    UndefinedSymbol { symbol: Symbol, site: SymbolSite },
    #[error("The axiom contains no variable, so rewriting would never change it")]
    FixedAxiom,
    #[error("Rule keys must match the variables one-to-one (variables without a rule: [{}], keys that are not variables: [{}])", .missing.join(", "), .extra.join(", "))]
    RuleVariableMismatch { missing: Vec<String>, extra: Vec<String> },
    #[error("Variables and constants share symbol(s): {}", .0.iter().join(", "))]
    VariableConstantOverlap(Vec<Symbol>),
    #[error("Unsupported operation `{0}`")]
    UnsupportedOperation(String),
    #[error("Translation keys must match the alphabet one-to-one (symbols without a translation: [{}], keys outside the alphabet: [{}])", .missing.join(", "), .extra.join(", "))]
    TranslationAlphabetMismatch { missing: Vec<String>, extra: Vec<String> },
    #[error("Invalid width `{0}`: expected a positive integer")]
    InvalidWidth(String),
    #[error("A `.json` file is required")]
    NotJsonFile,
    #[error("Malformed JSON document: {0}")]
    MalformedDocument(String),
    #[error("File error: {0}")]
    FileError(IoError),
}

impl ErrorType for ConfigErrorType {}

pub type ConfigError = Error<ConfigErrorType>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub type Result<T> = std::result::Result<T, ConfigErrorType>;

// Rule values after type checking, keys not yet matched to variables
#[derive(Debug, PartialEq)]
pub enum RawProduction {
    Deterministic(String),
    Stochastic(Vec<(f64, String)>),
}

pub type RawRules = Vec<(String, RawProduction)>;

fn base_fields(value: &Value) -> Result<&Map<String, Value>> {
    let document = value.as_object();
    let missing = BASE_FIELDS.into_iter()
        .filter(|key| !document.is_some_and(|document| document.contains_key(*key)))
        .collect_vec();

    match document {
        Some(document) if missing.is_empty() => Ok(document),
        _ => Err(ConfigErrorType::MissingFields(missing))
    }
}

// Duplicates collapse onto their first occurrence
fn symbol_list(value: &Value, field: Field) -> Result<Vec<Symbol>> {
    let items = value.as_array().ok_or(ConfigErrorType::InvalidType(field))?;
    let symbols = items.iter()
        .map(|item| item.as_str().and_then(|text| text.chars().exactly_one().ok()))
        .collect::<Option<Vec<Symbol>>>()
        .ok_or(ConfigErrorType::InvalidType(field))?;

    Ok(symbols.into_iter().unique().collect())
}

fn weighted_outcome(item: &Value) -> Option<(f64, String)> {
    let (weight, outcome) = item.as_array()?.iter().collect_tuple()?;
    let weight = weight.as_f64().filter(|weight| weight.is_finite() && *weight > 0.0)?;
    Some((weight, outcome.as_str()?.to_string()))
}

fn raw_production(value: &Value) -> Option<RawProduction> {
    match value {
        Value::String(outcome) => Some(RawProduction::Deterministic(outcome.clone())),
        Value::Array(items) if !items.is_empty() => items.iter()
            .map(weighted_outcome)
            .collect::<Option<Vec<_>>>()
            .map(RawProduction::Stochastic),
        _ => None
    }
}

fn rule_list(value: &Value) -> Result<RawRules> {
    let rules = value.as_object().ok_or(ConfigErrorType::InvalidType(Field::Rules))?;
    rules.iter()
        .map(|(key, production)| raw_production(production).map(|production| (key.clone(), production)))
        .collect::<Option<RawRules>>()
        .ok_or(ConfigErrorType::InvalidType(Field::Rules))
}

fn translation_list(value: &Value) -> Result<Vec<(String, String)>> {
    let translations = value.as_object().ok_or(ConfigErrorType::InvalidType(Field::Translations))?;
    translations.iter()
        .map(|(key, operation)| operation.as_str().map(|operation| (key.clone(), operation.to_string())))
        .collect::<Option<Vec<_>>>()
        .ok_or(ConfigErrorType::InvalidType(Field::Translations))
}

fn width(value: Option<&Value>) -> Result<u32> {
    let value = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_WIDTH),
        Some(value) => value
    };

    let width = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.parse::<u32>().ok(),
        _ => None
    };

    match width {
        Some(width) if width > 0 => Ok(width),
        _ => Err(ConfigErrorType::InvalidWidth(value.to_string()))
    }
}

fn drawing(translations: &Value, width_value: Option<&Value>, alphabet: &[Symbol]) -> Result<Drawing> {
    let translations = translation_list(translations)?;

    let operations = translations.iter()
        .map(|(key, text)| lexer::parse_operation(&lexer::lex_operation(text))
            .map(|operation| (key, operation))
            .ok_or_else(|| ConfigErrorType::UnsupportedOperation(text.clone())))
        .collect::<Result<Vec<_>>>()?;

    verify_translation_keys(translations.iter().map(|(key, _)| key), alphabet)?;

    let width = width(width_value)?;

    let operations = operations.into_iter()
        .filter_map(|(key, operation)| key.chars().next().map(|symbol| (symbol, operation)))
        .collect::<HashMap<_, _>>();

    Ok(Drawing::new(operations, width))
}

fn production(raw: RawProduction) -> Result<Production> {
    match raw {
        RawProduction::Deterministic(outcome) => Ok(Production::Deterministic(outcome)),
        RawProduction::Stochastic(outcomes) => Alternatives::new(outcomes)
            .map(Production::Stochastic)
            .map_err(|_| ConfigErrorType::InvalidType(Field::Rules))
    }
}

// Checks run in a fixed order, the first failure wins
fn validate(value: &Value, source: Location) -> Result<Grammar> {
    let document = base_fields(value)?;

    let variables = symbol_list(&document["variables"], Field::Variables)?;
    let constants = symbol_list(&document["constants"], Field::Constants)?;
    let axiom = document["axiom"].as_str().ok_or(ConfigErrorType::InvalidType(Field::Axiom))?;
    let raw_rules = rule_list(&document["rules"])?;

    verify_variables_present(&variables)?;

    let alphabet: Alphabet = variables.iter().chain(constants.iter()).copied().collect();
    verify_axiom_defined(axiom, &alphabet)?;
    verify_axiom_rewritable(axiom, &variables)?;
    verify_rule_keys(&raw_rules, &variables)?;
    verify_rule_outputs(&raw_rules, &alphabet)?;
    verify_disjoint(&variables, &constants)?;

    let drawing = match document.get("translations") {
        None | Some(Value::Null) => None,
        Some(translations) => {
            let ordered_alphabet = variables.iter().chain(constants.iter()).copied().collect_vec();
            Some(drawing(translations, document.get("width"), &ordered_alphabet)?)
        }
    };

    let mut rules = HashMap::with_capacity(raw_rules.len());
    for (key, raw) in raw_rules {
        if let Some(variable) = key.chars().next() {
            rules.insert(variable, production(raw)?);
        }
    }

    Ok(Grammar::new(source, variables, constants, axiom.to_string(), rules, drawing))
}

fn grammar_at(value: &Value, location: Location) -> ConfigResult<Grammar> {
    let grammar = validate(value, location.clone())
        .map_err(|error| ConfigError::new(location.clone(), error))?;

    debug!(
        source = %location,
        variables = grammar.variables().len(),
        constants = grammar.constants().len(),
        drawable = grammar.is_drawable(),
        stochastic = grammar.is_stochastic(),
        "validated grammar"
    );

    Ok(grammar)
}

/// Validates an already decoded description document.
pub fn grammar_from_value(value: &Value) -> ConfigResult<Grammar> {
    grammar_at(value, Location::inline())
}

pub fn parse_str(text: &str) -> ConfigResult<Grammar> {
    let value = serde_json::from_str::<Value>(text).map_err(|error| ConfigError::new(
        Location {
            line: error.line(),
            ..Location::inline()
        },
        ConfigErrorType::MalformedDocument(error.to_string())
    ))?;

    grammar_from_value(&value)
}

/// Loads and validates a `.json` description file.
pub fn parse_file(path: impl AsRef<Path>) -> ConfigResult<Grammar> {
    let path = path.as_ref();
    let location = Location::file(path);

    if path.extension().and_then(|extension| extension.to_str()) != Some("json") {
        return Err(ConfigError::new(location, ConfigErrorType::NotJsonFile));
    }

    let text = fs::read_to_string(path)
        .map_err(|error| ConfigError::new(location.clone(), ConfigErrorType::FileError(error.into())))?;

    let value = serde_json::from_str::<Value>(&text).map_err(|error| ConfigError::new(
        Location {
            file: path.to_path_buf(),
            line: error.line()
        },
        ConfigErrorType::MalformedDocument(error.to_string())
    ))?;

    grammar_at(&value, location)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn description() -> Value {
        json!({
            "variables": ["F", "G"],
            "constants": ["+", "X"],
            "axiom": "F",
            "rules": {
                "F": "F+FG",
                "G": "FX"
            },
            "translations": {
                "F": "draw 10",
                "G": "forward 10",
                "+": "angle 90",
                "X": "color red"
            },
            "width": 5
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut data = description();
        data[field] = value;
        data
    }

    fn without(field: &str) -> Value {
        let mut data = description();
        data.as_object_mut().unwrap().remove(field);
        data
    }

    fn error_of(data: &Value) -> ConfigErrorType {
        grammar_from_value(data).unwrap_err().error
    }

    #[test]
    fn parse_normal_description() {
        let grammar = grammar_from_value(&description()).unwrap();

        assert_eq!(grammar.variables(), &['F', 'G']);
        assert_eq!(grammar.constants(), &['+', 'X']);
        assert_eq!(grammar.axiom(), "F");
        assert_eq!(grammar.production('F'), Some(&Production::Deterministic("F+FG".to_string())));
        assert_eq!(grammar.production('+'), None);

        let drawing = grammar.drawing().unwrap();
        assert_eq!(drawing.width(), 5);
        assert_eq!(drawing.operation('F'), Some(&Operation::Draw(10.0)));
        assert_eq!(drawing.operation('G'), Some(&Operation::Move(10.0)));
        assert_eq!(drawing.operation('+'), Some(&Operation::Turn(90.0)));
        assert_eq!(drawing.operation('X'), Some(&Operation::SetColor(Color::Named(NamedColor::Red))));
    }

    #[test]
    fn missing_required_field() {
        for field in BASE_FIELDS {
            assert_eq!(error_of(&without(field)), ConfigErrorType::MissingFields(vec![field]));
        }
        assert_eq!(error_of(&json!([1, 2])), ConfigErrorType::MissingFields(BASE_FIELDS.to_vec()));
    }

    #[test]
    fn invalid_types() {
        let cases = vec![
            (with("variables", json!("F")), Field::Variables),
            (with("variables", json!(["FG"])), Field::Variables),
            (with("variables", json!([""])), Field::Variables),
            (with("constants", json!([23, 1, 18])), Field::Constants),
            (with("axiom", json!(5)), Field::Axiom),
            (with("rules", json!("ABA")), Field::Rules),
            (with("rules", json!({"F": 50, "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": [["some_string", "ABA"]], "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": [[25, "ABA", " "]], "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": ["0.5", 31], "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": [], "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": [[0, "F"]], "G": "FX"})), Field::Rules),
            (with("rules", json!({"F": [[-0.5, "F"], [1.5, "G"]], "G": "FX"})), Field::Rules),
            (with("translations", json!(13)), Field::Translations),
            (with("translations", json!({"F": 10})), Field::Translations)
        ];

        for (data, field) in cases {
            assert_eq!(error_of(&data), ConfigErrorType::InvalidType(field));
        }
    }

    #[test]
    fn invalid_width() {
        assert_eq!(error_of(&with("width", json!(-5))), ConfigErrorType::InvalidWidth("-5".to_string()));
        assert_eq!(error_of(&with("width", json!(0))), ConfigErrorType::InvalidWidth("0".to_string()));
        assert_eq!(error_of(&with("width", json!(2.5))), ConfigErrorType::InvalidWidth("2.5".to_string()));
        assert_eq!(error_of(&with("width", json!("thin"))), ConfigErrorType::InvalidWidth("\"thin\"".to_string()));
    }

    #[test]
    fn width_defaults_and_numeric_strings() {
        let grammar = grammar_from_value(&without("width")).unwrap();
        assert_eq!(grammar.drawing().unwrap().width(), DEFAULT_WIDTH);

        let grammar = grammar_from_value(&with("width", json!("3"))).unwrap();
        assert_eq!(grammar.drawing().unwrap().width(), 3);
    }

    #[test]
    fn grammar_without_translations_is_not_drawable() {
        let mut data = without("translations");
        // Width means nothing without translations
        data["width"] = json!(-1);
        let grammar = grammar_from_value(&data).unwrap();
        assert!(!grammar.is_drawable());
    }

    #[test]
    fn empty_variable_list() {
        let data = json!({"variables": [], "constants": ["+"], "axiom": "+", "rules": {}});
        assert_eq!(error_of(&data), ConfigErrorType::NoVariables);
    }

    #[test]
    fn axiom_with_no_variable() {
        assert_eq!(error_of(&with("axiom", json!("+X"))), ConfigErrorType::FixedAxiom);
    }

    #[test]
    fn axiom_with_undefined_symbol() {
        assert_eq!(error_of(&with("axiom", json!("F-F"))), ConfigErrorType::UndefinedSymbol {
            symbol: '-',
            site: SymbolSite::Axiom
        });
    }

    #[test]
    fn variable_with_no_rule() {
        let mut data = with("variables", json!(["F", "G", "H"]));
        data["translations"]["H"] = json!("nop");
        assert_eq!(error_of(&data), ConfigErrorType::RuleVariableMismatch {
            missing: vec!["H".to_string()],
            extra: vec![]
        });
    }

    #[test]
    fn rule_for_undefined_symbol() {
        let mut data = description();
        data["rules"]["+"] = json!("X");
        assert_eq!(error_of(&data), ConfigErrorType::RuleVariableMismatch {
            missing: vec![],
            extra: vec!["+".to_string()]
        });
    }

    #[test]
    fn rule_output_undefined_symbol() {
        let mut data = description();
        data["rules"]["G"] = json!("FX-");
        assert_eq!(error_of(&data), ConfigErrorType::UndefinedSymbol {
            symbol: '-',
            site: SymbolSite::Rule('G')
        });
    }

    #[test]
    fn overlapping_variables_and_constants() {
        let data = json!({"variables": ["A"], "constants": ["A"], "axiom": "A", "rules": {"A": "AA"}});
        assert_eq!(error_of(&data), ConfigErrorType::VariableConstantOverlap(vec!['A']));
    }

    #[test]
    fn symbol_with_no_translation() {
        let mut data = with("constants", json!(["+", "X", "-"]));
        data["rules"]["G"] = json!("FX-");
        assert_eq!(error_of(&data), ConfigErrorType::TranslationAlphabetMismatch {
            missing: vec!["-".to_string()],
            extra: vec![]
        });
    }

    #[test]
    fn translation_for_undefined_symbol() {
        let mut data = description();
        data["translations"]["Q"] = json!("forward 50");
        assert_eq!(error_of(&data), ConfigErrorType::TranslationAlphabetMismatch {
            missing: vec![],
            extra: vec!["Q".to_string()]
        });
    }

    #[test]
    fn unsupported_translations() {
        let operations = vec![
            "banana 25",
            "angle pineapple",
            "draw",
            "color 348 -12 25",
            "color #GGG",
            "color appelblauwzeegroen",
            "color 255.0 0 0",
            "color 1e2 0 0",
            "color -0 0 0"
        ];

        for operation in operations {
            let mut data = description();
            data["translations"]["F"] = json!(operation);
            assert_eq!(error_of(&data), ConfigErrorType::UnsupportedOperation(operation.to_string()));
        }
    }

    #[test]
    fn valid_colors() {
        let mut data = description();
        data["translations"]["F"] = json!("color 255 0 13");
        data["translations"]["G"] = json!("color #E0E000");
        data["translations"]["+"] = json!("color blue");
        assert!(grammar_from_value(&data).is_ok());
    }

    #[test]
    fn valid_stochastic_rules() {
        let mut data = description();
        data["rules"]["G"] = json!([[0.5, "FX"], [0.5, "XF"]]);
        let grammar = grammar_from_value(&data).unwrap();

        assert!(grammar.is_stochastic());
        assert_eq!(grammar.production('G').unwrap().outcomes(), vec!["FX", "XF"]);
    }

    #[test]
    fn duplicate_symbols_collapse() {
        let grammar = grammar_from_value(&with("variables", json!(["G", "F", "G"]))).unwrap();
        assert_eq!(grammar.variables(), &['G', 'F']);
    }

    #[test]
    fn checks_fire_in_order() {
        // Undefined axiom symbol beats the overlap and the rule mismatch
        let data = json!({"variables": ["A"], "constants": ["A"], "axiom": "AZ", "rules": {}});
        assert!(matches!(error_of(&data), ConfigErrorType::UndefinedSymbol { site: SymbolSite::Axiom, .. }));

        // Rule mismatch beats the overlap
        let data = json!({"variables": ["A"], "constants": ["A"], "axiom": "A", "rules": {}});
        assert!(matches!(error_of(&data), ConfigErrorType::RuleVariableMismatch { .. }));

        // Overlap beats every drawing check
        let data = json!({
            "variables": ["A"],
            "constants": ["A"],
            "axiom": "A",
            "rules": {"A": "A"},
            "translations": {"A": "banana"},
            "width": -1
        });
        assert_eq!(error_of(&data), ConfigErrorType::VariableConstantOverlap(vec!['A']));

        // Unsupported operation beats the alphabet mismatch, which beats the width
        let mut data = with("width", json!(-1));
        data["translations"]["Q"] = json!("nop");
        assert!(matches!(error_of(&data), ConfigErrorType::TranslationAlphabetMismatch { .. }));
        data["translations"]["F"] = json!("banana");
        assert_eq!(error_of(&data), ConfigErrorType::UnsupportedOperation("banana".to_string()));
    }

    #[test]
    fn parse_normal_file() {
        let grammar = parse_file("example_data/koch.json").unwrap();

        assert_eq!(grammar.source(), &Location::file("example_data/koch.json"));
        assert_eq!(grammar.axiom(), "F");
        assert_eq!(grammar.production('F'), Some(&Production::Deterministic("F+F-F-F+F".to_string())));
        assert_eq!(grammar.drawing().unwrap().operation('-'), Some(&Operation::Turn(-90.0)));
    }

    #[test]
    fn parse_malformed_file() {
        let error = parse_file("example_data/malformed.json").unwrap_err();

        assert!(matches!(error.error, ConfigErrorType::MalformedDocument(_)));
        assert_eq!(error.location.file, Path::new("example_data/malformed.json"));
        assert!(error.location.line > 0);
    }

    #[test]
    fn parse_invalid_file() {
        let error = parse_file("example_data/overlap.json").unwrap_err();
        assert_eq!(error, ConfigError::new(
            Location::file("example_data/overlap.json"),
            ConfigErrorType::VariableConstantOverlap(vec!['A'])
        ));
    }

    #[test]
    fn file_must_be_json() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "{}", description()).unwrap();

        assert_eq!(parse_file(file.path()).unwrap_err().error, ConfigErrorType::NotJsonFile);
    }

    #[test]
    fn missing_file() {
        let directory = tempfile::tempdir().unwrap();
        let error = parse_file(directory.path().join("absent.json")).unwrap_err();

        assert_eq!(error.error, ConfigErrorType::FileError(IoError(std::io::Error::from(std::io::ErrorKind::NotFound))));
    }

    #[test]
    fn parse_from_string() {
        let grammar = parse_str(&description().to_string()).unwrap();
        assert_eq!(grammar.source(), &Location::inline());

        let error = parse_str("{\"variables\": [").unwrap_err();
        assert!(matches!(error.error, ConfigErrorType::MalformedDocument(_)));
        assert_eq!(error.location.file, Location::inline().file);
        assert_eq!(error.location.line, 1);
    }
}
