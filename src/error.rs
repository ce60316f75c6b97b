//! # Error Types Module
//!
//! Centralized error handling for the heart-rate engine and its CLI.
//!
//! ## Error Types
//! - `ConfigError`: Configuration file I/O, parsing and validation errors
//! - `SessionError`: Session lifecycle misuse (stopping a session that is not running)
//! - `SourceError`: Failures reading or parsing incoming samples
//!
//! Noisy input is never an error. Insufficient data, missing peaks and
//! implausible rates are reported through `session::AnalysisOutcome` on the
//! per-frame status record instead.

use std::fmt;

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
    /// Config parsed but holds unusable values
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
            ConfigError::Invalid(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

/// Lifecycle misuse reported by `SessionController::stop_measurement`.
/// The session state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// No session has been started yet
    NotStarted,
    /// The session was already stopped
    AlreadyStopped,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotStarted => write!(f, "No measurement session has been started"),
            SessionError::AlreadyStopped => write!(f, "Measurement session is already stopped"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors that can occur while reading samples from an input stream
#[derive(Debug)]
pub enum SourceError {
    /// Underlying reader failed
    ReadFailed(std::io::Error),
    /// A line could not be parsed as a sample
    ParseFailed { line: usize, reason: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::ReadFailed(e) => write!(f, "Failed to read samples: {}", e),
            SourceError::ParseFailed { line, reason } => {
                write!(f, "Malformed sample on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::ReadFailed(e) => Some(e),
            SourceError::ParseFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::AlreadyStopped;
        assert!(err.to_string().contains("already stopped"));
    }

    #[test]
    fn test_config_error_chain() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::ReadFailed(io_err);
        assert!(err.source().is_some());
        assert!(ConfigError::Invalid("x".into()).source().is_none());
    }

    #[test]
    fn test_source_error_display() {
        let err = SourceError::ParseFailed {
            line: 7,
            reason: "expected 3 or 4 fields".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed sample on line 7: expected 3 or 4 fields");
    }
}
