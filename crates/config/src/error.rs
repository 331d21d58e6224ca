//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Exit code for missing or invalid command-line input
pub const EXIT_INVALID_INPUT: u8 = 1;

/// Exit code for an unreadable or malformed NATS context
pub const EXIT_CONTEXT: u8 = 3;

/// Errors that can occur while building a drain configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required flag was not provided
    #[error("no {flag} provided")]
    MissingFlag {
        /// Flag name without leading dashes
        flag: &'static str,
    },

    /// A flag was provided with an unusable value
    #[error("invalid --{flag}: {message}")]
    InvalidValue {
        /// Flag name without leading dashes
        flag: &'static str,
        /// What is wrong with the value
        message: String,
    },

    /// Home directory could not be determined
    #[error("could not determine home directory")]
    NoHomeDir,

    /// Context name file or context record could not be read
    #[error("failed to read context file '{path}': {source}")]
    ContextRead {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Context record is not valid JSON
    #[error("failed to parse context file '{path}': {source}")]
    ContextParse {
        /// Path to the file
        path: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Context name file exists but names nothing
    #[error("context name file '{path}' is empty")]
    EmptyContextName {
        /// Path to the file
        path: String,
    },
}

impl ConfigError {
    /// Create a MissingFlag error
    pub fn missing_flag(flag: &'static str) -> Self {
        Self::MissingFlag { flag }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(flag: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            flag,
            message: message.into(),
        }
    }

    /// True for errors raised while resolving the NATS context
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            Self::NoHomeDir
                | Self::ContextRead { .. }
                | Self::ContextParse { .. }
                | Self::EmptyContextName { .. }
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        if self.is_context_error() {
            EXIT_CONTEXT
        } else {
            EXIT_INVALID_INPUT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flag_error() {
        let err = ConfigError::missing_flag("stream");
        assert_eq!(err.to_string(), "no stream provided");
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("batch-size", "must be at least 1");
        assert!(err.to_string().contains("--batch-size"));
        assert!(err.to_string().contains("at least 1"));
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_context_errors_use_context_exit_code() {
        let err = ConfigError::ContextRead {
            path: "/nope/context.txt".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_context_error());
        assert_eq!(err.exit_code(), EXIT_CONTEXT);
        assert!(err.to_string().contains("/nope/context.txt"));

        assert_eq!(ConfigError::NoHomeDir.exit_code(), EXIT_CONTEXT);
        let err = ConfigError::EmptyContextName {
            path: "context.txt".to_string(),
        };
        assert_eq!(err.exit_code(), EXIT_CONTEXT);
    }
}
