//! Error types for the drain crate

use std::io;
use thiserror::Error;

/// Boxed error from the broker client
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Exit code when the broker cannot be reached
pub const EXIT_CONNECTION: u8 = 4;

/// Exit code when the stream or consumer cannot be set up
pub const EXIT_CONSUMER: u8 = 5;

/// Exit code when fetching fails
pub const EXIT_FETCH: u8 = 6;

/// Exit code when matched messages cannot be written
pub const EXIT_OUTPUT: u8 = 7;

/// Errors that end a drain run
#[derive(Error, Debug)]
pub enum DrainError {
    /// Broker unreachable or handshake rejected
    #[error("failed to connect to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Stream lookup or consumer creation rejected
    #[error("failed to create consumer on stream '{stream}': {source}")]
    ConsumerCreation {
        stream: String,
        #[source]
        source: BoxError,
    },

    /// Transport or protocol failure while fetching (an empty batch is not an error)
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// Writing to the output sink failed (e.g. broken pipe)
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl DrainError {
    pub fn connection(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Connection {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn consumer_creation(stream: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::ConsumerCreation {
            stream: stream.into(),
            source: source.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Connection { .. } => EXIT_CONNECTION,
            Self::ConsumerCreation { .. } => EXIT_CONSUMER,
            Self::Fetch { .. } => EXIT_FETCH,
            Self::Output(_) => EXIT_OUTPUT,
        }
    }
}

/// Result type for drain operations
pub type Result<T> = std::result::Result<T, DrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            DrainError::connection("nats://localhost:4222", "refused"),
            DrainError::consumer_creation("ORDERS", "stream not found"),
            DrainError::Fetch {
                attempts: 1,
                source: "reset".into(),
            },
            DrainError::Output(io::Error::new(io::ErrorKind::BrokenPipe, "closed")),
        ];
        let codes: Vec<u8> = errors.iter().map(DrainError::exit_code).collect();
        assert_eq!(codes, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_messages_name_the_target() {
        let err = DrainError::connection("nats://broker:4222", "refused");
        assert!(err.to_string().contains("nats://broker:4222"));

        let err = DrainError::consumer_creation("ORDERS", "stream not found");
        assert!(err.to_string().contains("'ORDERS'"));
        assert!(err.to_string().contains("stream not found"));
    }
}
