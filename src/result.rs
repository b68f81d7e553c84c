//! What a statement produces, and how it is rendered as text.

use std::fmt;

use crate::ast::ParseWarning;

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// The rows, each aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

impl fmt::Display for QueryResult {
    /// Header line, then one line per row, fields separated by tabs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

/// Why a `SELECT` stopped without output.
///
/// These are not errors: the statement simply yields nothing and nothing is
/// printed. They exist so callers and tests can tell the cases apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilentAbort {
    /// The source or joined table file does not exist.
    TableMissing(String),
    /// A join key does not name a column of its table.
    JoinColumnNotFound { table: String, column: String },
    /// The `WHERE` tail is not of the form `<column> = <value>`.
    InvalidWhere(String),
    /// The `WHERE` column is not in the current header.
    FilterColumnNotFound(String),
    /// A projected column is not in the current header.
    ProjectionColumnNotFound(String),
}

impl fmt::Display for SilentAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SilentAbort::TableMissing(table) => write!(f, "table '{table}' is missing"),
            SilentAbort::JoinColumnNotFound { table, column } => {
                write!(f, "join column '{column}' not found in '{table}'")
            }
            SilentAbort::InvalidWhere(clause) => write!(f, "invalid WHERE clause '{clause}'"),
            SilentAbort::FilterColumnNotFound(column) => {
                write!(f, "WHERE column '{column}' not found in result")
            }
            SilentAbort::ProjectionColumnNotFound(column) => {
                write!(f, "column '{column}' not found")
            }
        }
    }
}

/// The successful effect of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    TableCreated { table: String },
    RowInserted { table: String },
    Rows(QueryResult),
    /// A `SELECT` that stopped quietly. Renders as nothing.
    Empty(SilentAbort),
    Described { table: String, columns: Vec<String> },
    /// Input with no behavior attached, such as `SHOW DATABASES`.
    NoOp,
}

impl Outcome {
    /// Rows of a `SELECT`, if it produced any output.
    pub fn rows(&self) -> Option<&QueryResult> {
        match self {
            Outcome::Rows(result) => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::TableCreated { table } => {
                writeln!(f, "Table '{table}' created successfully.")
            }
            Outcome::RowInserted { .. } => writeln!(f, "Row successfully appended."),
            Outcome::Rows(result) => write!(f, "{result}"),
            Outcome::Described { table, columns } => {
                writeln!(f, "Columns in '{table}':")?;
                for column in columns {
                    writeln!(f, "- {column}")?;
                }
                Ok(())
            }
            Outcome::Empty(_) | Outcome::NoOp => Ok(()),
        }
    }
}

/// An [Outcome] together with the parse warnings of its statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub warnings: Vec<ParseWarning>,
    pub outcome: Outcome,
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        Self {
            warnings: Vec::new(),
            outcome,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.warnings {
            writeln!(f, "{warning}")?;
        }
        write!(f, "{}", self.outcome)
    }
}
