//! NATS context resolution
//!
//! The NATS CLI keeps named connection profiles on disk:
//!
//! ```text
//! ~/.config/nats/context.txt          # name of the selected context
//! ~/.config/nats/context/<name>.json  # the context record
//! ```
//!
//! Only the fields needed to open a connection are read. Unknown fields in
//! the record are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Server used when a context leaves `url` empty
pub const DEFAULT_SERVER_URL: &str = "nats://127.0.0.1:4222";

/// File holding the selected context name, relative to the NATS config root
pub const CONTEXT_NAME_FILE: &str = "context.txt";

/// Directory holding context records, relative to the NATS config root
pub const CONTEXT_DIR: &str = "context";

/// A resolved NATS connection profile
///
/// Empty strings in the record are treated as unset, which is how the NATS
/// CLI writes fields it has no value for.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NatsContext {
    /// Context name (from `context.txt` or `--context`), empty for `--server`
    #[serde(skip)]
    pub name: String,

    /// Server URL
    pub url: String,

    /// Username for user/password auth
    pub user: String,

    /// Password for user/password auth
    pub password: String,

    /// Token auth
    pub token: String,

    /// Path to a credentials file
    pub creds: String,
}

impl NatsContext {
    /// Build an anonymous context pointing at a server URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Server URL, falling back to the client default when unset
    pub fn server_url(&self) -> &str {
        non_empty(&self.url).unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Username and password, when both are set
    pub fn user_password(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.user)?, non_empty(&self.password)?))
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(&self.token)
    }

    pub fn creds_path(&self) -> Option<&Path> {
        non_empty(&self.creds).map(Path::new)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// Locations of the NATS CLI context files
#[derive(Debug, Clone)]
pub struct ContextPaths {
    root: PathBuf,
}

impl ContextPaths {
    /// Use an explicit NATS config root (the directory holding `context.txt`)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use `$HOME/.config/nats`
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(home.join(".config").join("nats")))
    }

    pub fn name_file(&self) -> PathBuf {
        self.root.join(CONTEXT_NAME_FILE)
    }

    pub fn context_file(&self, name: &str) -> PathBuf {
        self.root.join(CONTEXT_DIR).join(format!("{name}.json"))
    }

    /// Read the selected context name from `context.txt`
    pub fn selected_name(&self) -> Result<String> {
        let path = self.name_file();
        let contents = read(&path)?;
        let name = contents.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyContextName {
                path: path.display().to_string(),
            });
        }
        Ok(name.to_string())
    }

    /// Load a context record by name
    pub fn load(&self, name: &str) -> Result<NatsContext> {
        let path = self.context_file(name);
        let contents = read(&path)?;
        let mut context: NatsContext =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ContextParse {
                path: path.display().to_string(),
                source,
            })?;
        context.name = name.to_string();

        tracing::debug!(context = %name, path = %path.display(), "loaded nats context");
        Ok(context)
    }

    /// Load the named context, or the one selected in `context.txt`
    pub fn resolve(&self, name: Option<&str>) -> Result<NatsContext> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => self.load(name),
            None => self.load(&self.selected_name()?),
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::ContextRead {
        path: path.display().to_string(),
        source,
    })
}
