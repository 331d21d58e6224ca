//! Best-effort `.env` loading
//!
//! Only `.env` in the working directory is read; parent directories are never
//! searched. Runs before argument parsing so env-backed flags (`NATS_URL`,
//! `NATS_CONTEXT`, ...) pick up values from the file. Logging is not set up
//! yet at that point, so the outcome is returned for the caller to report.

use std::path::{Path, PathBuf};

/// Outcome of loading an env file
#[derive(Debug)]
pub enum EnvFile {
    /// File found and applied
    Loaded(PathBuf),
    /// No file present (not an error)
    Missing,
    /// File present but unusable
    Invalid(String),
}

impl EnvFile {
    /// Log the outcome; call once logging is initialized
    pub fn report(&self) {
        match self {
            Self::Loaded(path) => tracing::debug!(path = %path.display(), "loaded env file"),
            Self::Missing => {}
            Self::Invalid(reason) => tracing::warn!(error = %reason, "ignoring env file"),
        }
    }
}

/// Env file name looked up in the working directory
pub const ENV_FILE_NAME: &str = ".env";

/// Load `.env` from the working directory
pub fn load_env_file() -> EnvFile {
    load_env_file_in(Path::new("."))
}

/// Load `.env` from `dir` only
pub fn load_env_file_in(dir: &Path) -> EnvFile {
    load_env_file_from(&dir.join(ENV_FILE_NAME))
}

/// Load a specific env file
pub fn load_env_file_from(path: &Path) -> EnvFile {
    classify(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn classify(result: dotenvy::Result<PathBuf>) -> EnvFile {
    match result {
        Ok(path) => EnvFile::Loaded(path),
        Err(e) if e.not_found() => EnvFile::Missing,
        Err(e) => EnvFile::Invalid(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let status = load_env_file_from(&tmp.path().join(".env"));
        assert!(matches!(status, EnvFile::Missing));
    }

    #[test]
    fn test_loads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".env");
        fs::write(&path, "JSTAIL_ENV_TEST_LOADED=yes\n").unwrap();

        let status = load_env_file_from(&path);
        assert!(matches!(status, EnvFile::Loaded(ref p) if p == &path));
        assert_eq!(
            std::env::var("JSTAIL_ENV_TEST_LOADED").as_deref(),
            Ok("yes")
        );
    }

    #[test]
    fn test_parent_directory_is_not_searched() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".env"), "JSTAIL_ENV_TEST_PARENT=leaked\n").unwrap();
        let work = tmp.path().join("work");
        fs::create_dir(&work).unwrap();

        assert!(matches!(load_env_file_in(&work), EnvFile::Missing));
        assert!(std::env::var("JSTAIL_ENV_TEST_PARENT").is_err());
    }

    #[test]
    fn test_loads_from_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".env"), "JSTAIL_ENV_TEST_DIR=here\n").unwrap();

        let status = load_env_file_in(tmp.path());
        assert!(matches!(status, EnvFile::Loaded(ref p) if p == &tmp.path().join(".env")));
        assert_eq!(std::env::var("JSTAIL_ENV_TEST_DIR").as_deref(), Ok("here"));
    }

    #[test]
    fn test_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".env");
        fs::write(&path, "NOT A VALID LINE\n").unwrap();

        assert!(matches!(load_env_file_from(&path), EnvFile::Invalid(_)));
    }
}
