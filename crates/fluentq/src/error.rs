//! Error types for fluentq
//!
//! ## Error classification
//!
//! `QueryError` variants fall into two categories:
//!
//! **Caller errors** — bad input to the builder, reported before anything is
//! executed: [`UnknownMethod`](QueryError::UnknownMethod),
//! [`BadArgument`](QueryError::BadArgument),
//! [`Validation`](QueryError::Validation).
//!
//! **Collaborator errors** — surfaced unchanged from the connection, cache,
//! or row decoding: [`Connection`](QueryError::Connection),
//! [`Cache`](QueryError::Cache), [`Decode`](QueryError::Decode).
//!
//! Empty result sets are never errors; terminal operations that may come up
//! empty return `Option` values instead.

use thiserror::Error;

/// Result type alias for fluentq operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Error types for query building and execution.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Dynamic dispatch received a method name it cannot interpret.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// A builder method received arguments it cannot work with.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Builder state is not executable (e.g. no target table).
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection-level failure, propagated unchanged.
    #[error("connection error: {0}")]
    Connection(String),

    /// Cache-manager failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// A row was missing or had an unusable value for a column.
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl QueryError {
    /// Create an unknown-method error
    pub fn unknown_method(name: impl Into<String>) -> Self {
        Self::UnknownMethod(name.into())
    }

    /// Create a bad-argument error
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error originated in caller input rather than
    /// a collaborator.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMethod(_) | Self::BadArgument(_) | Self::Validation(_)
        )
    }

    /// Check if this is an unknown-method error
    pub fn is_unknown_method(&self) -> bool {
        matches!(self, Self::UnknownMethod(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a cache error
    pub fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}
