//! Error types shared by every facade.

use mongodb::{
    bson,
    error::{Error as DriverError, ErrorKind},
};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T, E = PanacheError> = std::result::Result<T, E>;

/// Errors produced by the query, update and repository facades.
///
/// Absence is never an error: lookups by id resolve to `None` and deletions
/// by id resolve to `false`.
#[derive(Error, Debug)]
pub enum PanacheError {
    /// The query text could not be parsed, or its placeholders do not match
    /// the supplied parameters.
    #[error("malformed query `{query}`: {reason}")]
    MalformedQuery { query: String, reason: String },

    /// The update could not be interpreted as an operator document or as a
    /// list of field assignments.
    #[error("malformed update `{update}`: {reason}")]
    MalformedUpdate { update: String, reason: String },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] DriverError),

    /// Any other driver failure, surfaced unmodified.
    #[error("mongodb error: {0}")]
    Driver(#[source] DriverError),

    #[error("bson serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("bson deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    /// A single result was requested but several documents matched.
    #[error("query matched more than one document")]
    NonUniqueResult,

    #[error("configuration error: {0}")]
    Config(String),
}

impl PanacheError {
    pub fn malformed_query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_update(update: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUpdate {
            update: update.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the error was raised by input validation, before any request
    /// reached the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedQuery { .. } | Self::MalformedUpdate { .. }
        )
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<DriverError> for PanacheError {
    fn from(err: DriverError) -> Self {
        match *err.kind {
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => Self::StoreUnavailable(err),
            _ => Self::Driver(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_query_and_reason() {
        let err = PanacheError::malformed_query("author = ?2", "no positional parameter ?2");
        assert_eq!(
            err.to_string(),
            "malformed query `author = ?2`: no positional parameter ?2"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn update_errors_are_validation_errors() {
        let err = PanacheError::malformed_update("{}", "empty update");
        assert!(err.is_validation());
        assert!(!err.is_store_unavailable());
    }

    #[test]
    fn io_failures_map_to_store_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = PanacheError::from(DriverError::from(io));
        assert!(err.is_store_unavailable());
        assert!(!err.is_validation());
    }
}
