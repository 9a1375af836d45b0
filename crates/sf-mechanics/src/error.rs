//! Error types for the ruleset, repair engine and generator.

use sf_core::CoreError;
use sf_dsl::DslError;

/// Errors that can occur while building or using a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// A core error (catalog JSON, operators, patterns).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A content text error (formula, prerequisite, note).
    #[error(transparent)]
    Dsl(#[from] DslError),

    /// A category name is not one the generator knows.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// A content entry is unusable.
    #[error("{table}.{name}: {message}")]
    InvalidEntry {
        /// Catalog table.
        table: String,
        /// Entry name.
        name: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
