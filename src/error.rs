//! Error types shared by the parser, the storage layer and the executor.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for executor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A statement whose verb was recognized but whose shape was not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid CREATE syntax.")]
    InvalidCreateSyntax,

    #[error("Invalid INSERT syntax.")]
    InvalidInsertSyntax,

    #[error("Invalid FROM syntax.")]
    InvalidFromSyntax,
}

/// Failures of the table files themselves.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure on a table file or the database directory.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but has no header line.
    #[error("table '{table}' has no header")]
    MissingHeader { table: String },

    /// A data line whose field count disagrees with the header.
    #[error("line {line} of table '{table}' has {found} fields, expected {expected}")]
    MalformedRow {
        table: String,
        line: usize,
        expected: usize,
        found: usize,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reported failures of one statement. Execution stops and nothing is
/// left half-written.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Table '{0}' already exists.")]
    TableAlreadyExists(String),

    #[error("Table '{0}' does not exist in the current database.")]
    TableNotFound(String),

    #[error("Column count does not match table defined (expected {expected}, got {found}).")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
