//! Error types for tasklens.

use thiserror::Error;

/// Result type alias using tasklens's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tasklens operations.
///
/// Only `Config` is fatal; everything else is recovered into a
/// [`StructuredError`](crate::StructuredError) at the pipeline boundary
/// where it occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is malformed. Fatal, surfaced immediately, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion service failed (timeout, non-success status, malformed body).
    #[error("Completion error: {0}")]
    Completion(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Completion(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing term list".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing term list");
    }

    #[test]
    fn test_error_display_completion() {
        let err = Error::Completion("request timed out".to_string());
        assert_eq!(err.to_string(), "Completion error: request timed out");
    }

    #[test]
    fn test_error_display_serialization() {
        let err = Error::Serialization("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid JSON");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty query".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty query");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
