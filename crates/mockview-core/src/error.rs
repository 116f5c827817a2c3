//! Error types for the Mockview application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Mockview application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MockviewError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Append or submit attempted against a run that already has a terminal turn
    #[error("Session run already terminated: '{run_id}'")]
    RunTerminated { run_id: String },

    /// A candidate answer was submitted while another one is still in flight,
    /// or while the run is not awaiting candidate input
    #[error("Out of turn for session run '{run_id}'")]
    OutOfTurn { run_id: String },

    /// The question-generation collaborator failed permanently or exhausted retries
    #[error("Question generation failed: {0}")]
    GenerationFailed(String),

    /// Invalid caller-supplied input (e.g. duration out of bounds)
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MockviewError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a RunTerminated error
    pub fn run_terminated(run_id: impl Into<String>) -> Self {
        Self::RunTerminated {
            run_id: run_id.into(),
        }
    }

    /// Creates an OutOfTurn error
    pub fn out_of_turn(run_id: impl Into<String>) -> Self {
        Self::OutOfTurn {
            run_id: run_id.into(),
        }
    }

    /// Creates a GenerationFailed error
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a turn-taking conflict (terminated run or
    /// out-of-turn submission) that the caller should not retry blindly.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RunTerminated { .. } | Self::OutOfTurn { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for MockviewError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MockviewError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MockviewError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, MockviewError>`.
pub type Result<T> = std::result::Result<T, MockviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        assert!(MockviewError::run_terminated("r1").is_conflict());
        assert!(MockviewError::out_of_turn("r1").is_conflict());
        assert!(!MockviewError::not_found("interview", "i1").is_conflict());
        assert!(!MockviewError::generation_failed("boom").is_conflict());
    }

    #[test]
    fn test_from_io_error() {
        let err: MockviewError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, MockviewError::Io { .. }));
    }
}
