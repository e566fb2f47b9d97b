/*
    This module records processed L-systems in an append-only history log
*/

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use thiserror::Error;

use crate::error_handling::*;
use crate::grammar::*;

pub const FIELD_COUNT: usize = 8;

/// One processed L-system, as written to the history log.
///
/// The grammar is kept in its rendered text form; the field order of
/// [`HistoryRecord::to_line`] is read back by log consumers and must not
/// change.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub variables: String,
    pub constants: String,
    pub axiom: String,
    pub rules: String,
    pub translations: String,
    pub iterations: u64,
    pub result: String,
}

fn render_production(production: &Production) -> String {
    match production {
        Production::Deterministic(outcome) => outcome.clone(),
        Production::Stochastic(alternatives) => format!(
            "[{}]",
            alternatives.outcomes().iter().map(|(weight, outcome)| format!("{} {}", weight, outcome)).join("; ")
        ),
    }
}

fn render_rules(grammar: &Grammar) -> String {
    grammar.variables().iter()
        .filter_map(|variable| grammar.production(*variable).map(|production| format!("{} -> {}", variable, render_production(production))))
        .join(", ")
}

fn render_translations(grammar: &Grammar) -> String {
    match grammar.drawing() {
        Some(drawing) => grammar.alphabet()
            .filter_map(|symbol| drawing.operation(symbol).map(|operation| format!("{} : {}", symbol, operation)))
            .join(", "),
        None => String::new(),
    }
}

impl HistoryRecord {
    pub fn new(grammar: &Grammar, iterations: u64, result: &str) -> Self {
        HistoryRecord {
            timestamp: Utc::now(),
            variables: grammar.variables().iter().join(", "),
            constants: grammar.constants().iter().join(", "),
            axiom: grammar.axiom().to_string(),
            rules: render_rules(grammar),
            translations: render_translations(grammar),
            iterations,
            result: result.to_string(),
        }
    }

    // Tab separated, without the trailing newline
    pub fn to_line(&self) -> String {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.variables.clone(),
            self.constants.clone(),
            self.axiom.clone(),
            self.rules.clone(),
            self.translations.clone(),
            self.iterations.to_string(),
            self.result.clone(),
        ].join("\t")
    }

    pub fn parse_line(line: &str) -> Result<Self, HistoryErrorType> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let fields = line.split('\t').collect_vec();
        let (timestamp, variables, constants, axiom, rules, translations, iterations, result) = fields
            .iter()
            .copied()
            .collect_tuple()
            .ok_or(HistoryErrorType::FieldCount(fields.len()))?;

        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| HistoryErrorType::InvalidTimestamp(timestamp.to_string()))?
            .with_timezone(&Utc);
        let iterations = iterations
            .parse::<u64>()
            .map_err(|_| HistoryErrorType::InvalidIterations(iterations.to_string()))?;

        Ok(HistoryRecord {
            timestamp,
            variables: variables.to_string(),
            constants: constants.to_string(),
            axiom: axiom.to_string(),
            rules: rules.to_string(),
            translations: translations.to_string(),
            iterations,
            result: result.to_string(),
        })
    }
}

#[derive(Debug, PartialEq, Error)]
pub enum HistoryErrorType {
    #[error("Expected 8 tab-separated fields, found {0}")]
    FieldCount(usize),
    #[error("Invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error("Invalid iteration count `{0}`")]
    InvalidIterations(String),
    #[error("File error: {0}")]
    FileError(IoError),
}

impl ErrorType for HistoryErrorType {}

pub type HistoryError = Error<HistoryErrorType>;
pub type HistoryErrors = Errors<HistoryErrorType>;

/// Receives one record per completed rewrite of a drawable grammar.
pub trait HistoryRecorder {
    fn record(&mut self, record: &HistoryRecord) -> std::io::Result<()>;
}

impl<H: HistoryRecorder + ?Sized> HistoryRecorder for &mut H {
    fn record(&mut self, record: &HistoryRecord) -> std::io::Result<()> {
        (**self).record(record)
    }
}

impl<H: HistoryRecorder + ?Sized> HistoryRecorder for Box<H> {
    fn record(&mut self, record: &HistoryRecord) -> std::io::Result<()> {
        (**self).record(record)
    }
}

// Discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl HistoryRecorder for NoHistory {
    fn record(&mut self, _record: &HistoryRecord) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    pub records: Vec<HistoryRecord>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryRecorder for MemoryHistory {
    fn record(&mut self, record: &HistoryRecord) -> std::io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Appends records as tab-separated lines to a log file, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileHistory { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_error(&self, error: std::io::Error) -> HistoryErrors {
        vec![HistoryError::new(Location::file(&self.path), HistoryErrorType::FileError(error.into()))]
    }

    /// Reads back every entry, reporting each malformed line with its line number.
    pub fn entries(&self) -> Result<Vec<HistoryRecord>, HistoryErrors> {
        let text = fs::read_to_string(&self.path).map_err(|error| self.file_error(error))?;

        let (records, errors): (Vec<_>, Vec<_>) = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
            .map(|(num, line)| HistoryRecord::parse_line(line).map_err(|error| HistoryError::new(
                Location {
                    file: self.path.clone(),
                    line: num + 1
                },
                error
            )))
            .partition_result();

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(records)
    }

    pub fn latest(&self) -> Result<Option<HistoryRecord>, HistoryErrors> {
        Ok(self.entries()?.pop())
    }
}

impl HistoryRecorder for FileHistory {
    fn record(&mut self, record: &HistoryRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{}", record.to_line())
    }
}
