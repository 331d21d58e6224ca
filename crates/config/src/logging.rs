//! Logging level selection
//!
//! Diagnostics go to stderr; this only decides how chatty they are.

use std::str::FromStr;

use crate::error::ConfigError;

/// Diagnostic verbosity; `-v` maps to `Debug`, `-q` to `Error`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Pick a level from CLI input: explicit level > verbose > quiet > info
    pub fn resolve(
        explicit: Option<&str>,
        verbose: bool,
        quiet: bool,
    ) -> Result<Self, ConfigError> {
        if let Some(level) = explicit {
            return level.parse();
        }
        Ok(if verbose {
            Self::Debug
        } else if quiet {
            Self::Error
        } else {
            Self::Info
        })
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "err" => Ok(Self::Error),
            other => Err(ConfigError::invalid_value(
                "log-level",
                format!("unknown level '{other}'"),
            )),
        }
    }
}
