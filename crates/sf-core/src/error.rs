/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building rule graphs or reading content.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An operator token is not one of `=`, `+=`, `^=`, `v`, `*=`, `?`.
    #[error("unknown operator: {0:?}")]
    UnknownOperator(String),

    /// A `Key=Value` attribute list could not be read.
    #[error("malformed attribute list at byte {offset}: {message}")]
    MalformedEntry {
        /// Byte offset of the problem in the attribute list.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// A field that must be numeric holds something else.
    #[error("field {key} is not a number: {value:?}")]
    NotANumber {
        /// The attribute-list key.
        key: String,
        /// The offending raw value.
        value: String,
    },

    /// A regular expression in a prerequisite failed to compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern source text.
        pattern: String,
        /// The regex engine's complaint.
        message: String,
    },

    /// The catalog document is not valid JSON of the expected shape.
    #[error("invalid catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}
