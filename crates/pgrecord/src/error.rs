//! Error types for pgrecord

use crate::value::EncodeError;
use std::error::Error as StdError;
use thiserror::Error;

/// Result type alias for pgrecord operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
///
/// "Not found" is not an error in this crate: lookups return `Option`,
/// fetches return an empty `Vec` and removals of unsaved records return `false`.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error (missing variable, unreadable or malformed file)
    #[error("Config error: {0}")]
    Config(String),

    /// Query execution error
    #[error("Query error: {}", with_source(.0))]
    Query(#[from] tokio_postgres::Error),

    /// A bound value could not be converted to its parameter's type
    #[error("Encode error: {0}")]
    Encode(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error (bad identifier, unbound placeholder, empty update...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is an encode error
    pub fn is_encode(&self) -> bool {
        matches!(self, Self::Encode(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        if let Some(encode) = err.source().and_then(|s| s.downcast_ref::<EncodeError>()) {
            return Self::Encode(encode.to_string());
        }
        Self::Query(err)
    }
}

/// `err` followed by its cause; the driver's own message for server errors is
/// only "db error".
fn with_source(err: &dyn StdError) -> String {
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_column() {
        let err = OrmError::decode("price", "unsupported type");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'price': unsupported type"
        );
    }

    #[derive(Debug)]
    struct Outer(std::fmt::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("db error")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn message_includes_cause() {
        assert_eq!(
            with_source(&Outer(std::fmt::Error)),
            "db error: an error occurred when formatting an argument"
        );
        assert_eq!(with_source(&std::fmt::Error), "an error occurred when formatting an argument");
    }

    #[test]
    fn encode_error_display() {
        let err = OrmError::Encode("cannot bind text value".into());
        assert!(err.is_encode());
        assert_eq!(err.to_string(), "Encode error: cannot bind text value");
    }

    #[test]
    fn validation_helpers() {
        let err = OrmError::validation("bad");
        assert!(err.is_validation());
        assert!(!err.is_unique_violation());
    }
}
