//! Error types for the formula, prerequisite and note front ends.

use std::fmt;

use sf_core::CoreError;

/// Alias for `Result<T, DslError>`.
pub type DslResult<T> = Result<T, DslError>;

/// A formula syntax error with source span.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Byte range of the problem in the formula text.
    pub span: std::ops::Range<usize>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

/// Errors raised while turning content text into rule edges.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    /// Formula text does not parse.
    #[error("invalid formula {text:?}: {}", first(errors))]
    Formula {
        /// The formula text.
        text: String,
        /// Every syntax error found.
        errors: Vec<ParseError>,
    },

    /// Prerequisite text does not parse.
    #[error("invalid prerequisite {text:?}: {message}")]
    Prerequisite {
        /// The prerequisite text.
        text: String,
        /// What went wrong.
        message: String,
    },

    /// A trait lists a different number of sections and notes.
    #[error("{name}: {sections} section(s) but {notes} note(s)")]
    MismatchedNotes {
        /// The trait.
        name: String,
        /// Number of sections.
        sections: usize,
        /// Number of notes.
        notes: usize,
    },

    /// A core error (bad operator, bad pattern).
    #[error(transparent)]
    Core(#[from] CoreError),
}

fn first(errors: &[ParseError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "syntax error".to_string())
}
