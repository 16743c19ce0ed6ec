use thiserror::Error;

/// Malformed expected-value expression.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset into the expression text.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self { offset, message: message.into() }
    }
}

/// Errors raised while building expectations, before any comparison runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("{name}(): {message}")]
    BadArgument { name: String, message: String },

    #[error("record {record} has {expected} field(s), got {got} value(s)")]
    FieldCount {
        record: String,
        expected: usize,
        got: usize,
    },

    #[error("record {0} is already defined")]
    AlreadyDefined(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("invalid JSON: {0}")]
    Json(String),
}

// Type alias for results that use `UsageError` as the error type
pub type Result<T> = std::result::Result<T, UsageError>;

impl From<serde_json::Error> for UsageError {
    fn from(e: serde_json::Error) -> Self {
        UsageError::Json(e.to_string())
    }
}
