//! Error types for the taxonomy integrity engine.

use thiserror::Error;

use crate::models::Level;

/// Result type alias using taxon's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for taxonomy analysis.
///
/// Only conditions that make a meaningful scan impossible are errors.
/// Per-entity anomalies are reported as issues instead.
#[derive(Error, Debug)]
pub enum Error {
    /// An entity was supplied without an identifier
    #[error("Missing id: {level} at position {position} has an empty id")]
    MissingId { level: Level, position: usize },

    /// Two entities of the same level share an identifier
    #[error("Duplicate id: {level} id '{id}' appears more than once")]
    DuplicateId { level: Level, id: String },

    /// Analysis was cancelled by the caller
    #[error("Analysis cancelled")]
    Cancelled,

    /// Analysis exceeded its deadline
    #[error("Analysis timed out")]
    TimedOut,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that abort a run without saying anything about the data.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::TimedOut)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(e: crate::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_id() {
        let err = Error::MissingId {
            level: Level::Subcategory,
            position: 3,
        };
        assert_eq!(
            err.to_string(),
            "Missing id: subcategory at position 3 has an empty id"
        );
    }

    #[test]
    fn test_error_display_duplicate_id() {
        let err = Error::DuplicateId {
            level: Level::Provider,
            id: "p-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate id: provider id 'p-1' appears more than once"
        );
    }

    #[test]
    fn test_error_display_cancelled_and_timed_out() {
        assert_eq!(Error::Cancelled.to_string(), "Analysis cancelled");
        assert_eq!(Error::TimedOut.to_string(), "Analysis timed out");
        assert!(Error::Cancelled.is_interrupted());
        assert!(Error::TimedOut.is_interrupted());
        assert!(!Error::Config("x".to_string()).is_interrupted());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
