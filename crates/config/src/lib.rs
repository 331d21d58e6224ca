//! jstail configuration
//!
//! Everything the drain needs is gathered into one immutable [`DrainConfig`]
//! before the broker is contacted. Building it follows the order the CLI uses:
//!
//! 1. Required flags are checked ([`require`], [`parse_subjects`]). This never
//!    touches the filesystem or network.
//! 2. The NATS context is resolved ([`ContextPaths::resolve`]) unless a server
//!    URL was given directly.
//! 3. Tuning knobs are applied and the result is validated.
//!
//! # Example
//!
//! ```
//! use jstail_config::{DrainConfig, NatsContext, parse_subjects};
//!
//! let subjects = parse_subjects("orders.created,orders.updated").unwrap();
//! let config = DrainConfig::new(NatsContext::from_url("nats://localhost:4222"), "ORDERS", subjects)
//!     .with_query("customer-42");
//! assert!(config.validate().is_ok());
//! ```

mod context;
mod env;
mod error;
mod logging;

use std::str::FromStr;
use std::time::Duration;

pub use context::{
    CONTEXT_DIR, CONTEXT_NAME_FILE, ContextPaths, DEFAULT_SERVER_URL, NatsContext,
};
pub use env::{ENV_FILE_NAME, EnvFile, load_env_file, load_env_file_from, load_env_file_in};
pub use error::{ConfigError, EXIT_CONTEXT, EXIT_INVALID_INPUT, Result};
pub use logging::LogLevel;

/// Maximum messages requested per fetch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How long one fetch waits for messages before returning what it has
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(3);

/// Output format for matched messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Payload bytes followed by a newline (default)
    #[default]
    Raw,
    /// One JSON object per line with subject, sequence and payload
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "raw" | "r" => Ok(Self::Raw),
            "json" | "j" => Ok(Self::Json),
            other => Err(ConfigError::invalid_value(
                "output",
                format!("unknown format '{other}' (expected raw or json)"),
            )),
        }
    }
}

/// Everything a drain run needs, fixed at startup
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Where and how to connect
    pub context: NatsContext,

    /// Stream to read from
    pub stream: String,

    /// Subjects the consumer is filtered to (non-empty)
    pub subjects: Vec<String>,

    /// Substring a payload must contain to be printed (empty = all)
    pub query: String,

    /// Maximum messages per fetch
    /// Default: 100
    pub batch_size: usize,

    /// Maximum wait per fetch
    /// Default: 3s
    pub max_wait: Duration,

    /// Extra attempts after a failed fetch
    /// Default: 0
    pub fetch_retries: u32,

    /// Output format
    pub format: OutputFormat,
}

impl DrainConfig {
    /// Create a config with default tuning
    pub fn new(context: NatsContext, stream: impl Into<String>, subjects: Vec<String>) -> Self {
        Self {
            context,
            stream: stream.into(),
            subjects,
            query: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_wait: DEFAULT_MAX_WAIT,
            fetch_retries: 0,
            format: OutputFormat::Raw,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_fetch_retries(mut self, retries: u32) -> Self {
        self.fetch_retries = retries;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Check invariants the drain relies on
    pub fn validate(&self) -> Result<()> {
        if self.stream.is_empty() {
            return Err(ConfigError::missing_flag("stream"));
        }
        if self.subjects.is_empty() || self.subjects.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::missing_flag("subjects"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid_value("batch-size", "must be at least 1"));
        }
        if self.max_wait.is_zero() {
            return Err(ConfigError::invalid_value("max-wait", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Return a required flag value, treating empty as absent
pub fn require<'a>(flag: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::missing_flag(flag)),
    }
}

/// Split a comma-separated subject list, dropping empty segments
pub fn parse_subjects(raw: &str) -> Result<Vec<String>> {
    let subjects: Vec<String> = raw
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if subjects.is_empty() {
        return Err(ConfigError::invalid_value(
            "subjects",
            format!("'{raw}' contains no subjects"),
        ));
    }
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DrainConfig {
        DrainConfig::new(
            NatsContext::from_url("nats://localhost:4222"),
            "EVENTS",
            vec!["events.>".to_string()],
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_wait, Duration::from_secs(3));
        assert_eq!(config.fetch_retries, 0);
        assert_eq!(config.format, OutputFormat::Raw);
        assert!(config.query.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_stream() {
        let mut config = config();
        config.stream.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingFlag { flag: "stream" })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_subjects() {
        let mut config = config();
        config.subjects.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingFlag { flag: "subjects" })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let err = config().with_batch_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("batch-size"));

        let err = config().with_max_wait(Duration::ZERO).validate().unwrap_err();
        assert!(err.to_string().contains("max-wait"));
    }

    #[test]
    fn test_require() {
        assert_eq!(require("stream", Some("ORDERS")).unwrap(), "ORDERS");
        assert!(matches!(
            require("stream", None),
            Err(ConfigError::MissingFlag { flag: "stream" })
        ));
        assert!(matches!(
            require("subjects", Some("")),
            Err(ConfigError::MissingFlag { flag: "subjects" })
        ));
    }

    #[test]
    fn test_parse_subjects() {
        assert_eq!(parse_subjects("a.b").unwrap(), vec!["a.b"]);
        assert_eq!(
            parse_subjects("orders.*,payments.>").unwrap(),
            vec!["orders.*", "payments.>"]
        );
        assert_eq!(parse_subjects("a,,b,").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_subjects_all_empty() {
        let err = parse_subjects(",,").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { flag: "subjects", .. }));
        assert_eq!(err.exit_code(), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("raw".parse::<OutputFormat>().unwrap(), OutputFormat::Raw);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("j".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
