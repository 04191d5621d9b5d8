//! Defines the error kinds shared by tables, datasets, producers and the assertion engine.
//!
//! Each kind is a separate variant so that callers can match on it rather than on message text.

use crate::assertion::ComparisonFailure;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Ambiguous table name: {0}")]
    AmbiguousTableName(String),
    #[error("No such table: {0}")]
    NoSuchTable(String),
    #[error("No such column {column} in table {table}")]
    NoSuchColumn { table: String, column: String },
    #[error("Table {0} has no primary key")]
    NoPrimaryKey(String),
    #[error("Row {row} is out of bounds for table {table} (row count {limit})")]
    RowOutOfBounds {
        table: String,
        row: usize,
        limit: usize,
    },
    #[error("Table {table} is forward-only: row {requested} requested after row {current}")]
    ForwardOnly {
        table: String,
        requested: usize,
        current: usize,
    },
    #[error("Table {0} is forward-only and does not know its row count")]
    RowCountUnsupported(String),
    #[error("Table {0} is closed")]
    Closed(String),
    #[error("Type cast failed: {0}")]
    TypeCast(#[from] crate::sql_type::Error),
    #[error("Dataset is not ready: the producer has not finished")]
    NotReady,
    #[error("Illegal protocol call {event} in state {state}")]
    Protocol { state: String, event: String },
    #[error("Table {0} is referenced but never declared")]
    MissingDeclaration(String),
    #[error("No replacement configured for placeholder {0}")]
    UnmatchedReplacement(String),
    #[error("{0}")]
    Comparison(ComparisonFailure),
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: &'static str,
        message: String,
    },
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// true for the bounds family: out-of-range rows and backward moves on forward-only tables.
    pub fn is_bounds(&self) -> bool {
        matches!(self, Error::RowOutOfBounds { .. } | Error::ForwardOnly { .. })
    }
}
