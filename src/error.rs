// ⚠️ Load Errors - Data integrity failures surfaced by the dataset loader
// Any of these aborts the report

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// SQLite file could not be opened
    #[error("failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query against one of the five relations failed (missing table/column, etc.)
    #[error("failed to read relation {relation}: {source}")]
    Query {
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Identifier column held something that is not an integer
    #[error("{relation}.{column}: cannot decode identifier ({detail})")]
    InvalidIdentifier {
        relation: &'static str,
        column: &'static str,
        detail: String,
    },

    /// Same primary identifier appears twice in its owning table
    #[error("{relation}: duplicate {column} {id}")]
    DuplicateIdentifier {
        relation: &'static str,
        column: &'static str,
        id: i64,
    },

    /// Join table references an identifier its owning table does not have
    #[error("{relation}: {column} {id} does not resolve in {owner}")]
    UnresolvedReference {
        relation: &'static str,
        column: &'static str,
        id: i64,
        owner: &'static str,
    },

    /// Text column held a non-text value
    #[error("{relation}.{column}: expected text for id {id}")]
    InvalidText {
        relation: &'static str,
        column: &'static str,
        id: i64,
    },

    /// CSV export could not be read during import
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// CSV export lacks a column the relation needs
    #[error("{path}: missing column {column}")]
    MissingColumn {
        path: PathBuf,
        column: &'static str,
    },

    /// Writing the imported dataset failed
    #[error("failed to write relation {relation}: {source}")]
    Write {
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl LoadError {
    /// True for errors caused by the dataset's content rather than I/O
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            LoadError::InvalidIdentifier { .. }
                | LoadError::DuplicateIdentifier { .. }
                | LoadError::UnresolvedReference { .. }
                | LoadError::InvalidText { .. }
        )
    }
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;
