//! Error types and handling for the availability engine

use thiserror::Error;

/// Main error type for the availability engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed input rejected at construction or registration time
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The roster supplier failed on every retry attempt
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Raised when an underlying fetch failed on every attempt.
///
/// Cloneable so that every caller coalesced onto the same in-flight fetch
/// observes the identical error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Fetch failed after {attempts} attempt(s): {message}")]
pub struct FetchError {
    /// Number of attempts made before giving up
    pub attempts: u32,
    /// Rendered error chain of the last failed attempt
    pub message: String,
}

impl FetchError {
    pub fn new<S: Into<String>>(attempts: u32, message: S) -> Self {
        Self {
            attempts,
            message: message.into(),
        }
    }
}

impl EngineError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation { message } => format!("Invalid input: {message}"),
            EngineError::Fetch(_) => {
                "Unable to load the participant roster. Please try again later.".to_string()
            }
            EngineError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = EngineError::config("bad level");
        assert!(matches!(config_err, EngineError::Config { .. }));

        let validation_err = EngineError::validation("latitude out of range");
        assert!(matches!(validation_err, EngineError::Validation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = EngineError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let fetch_err: EngineError = FetchError::new(3, "connection refused").into();
        assert!(fetch_err.user_message().contains("Unable to load"));

        let validation_err = EngineError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));
    }

    #[test]
    fn test_fetch_error_display_is_transparent() {
        let err: EngineError = FetchError::new(3, "connection refused").into();
        assert_eq!(
            err.to_string(),
            "Fetch failed after 3 attempt(s): connection refused"
        );
    }
}
