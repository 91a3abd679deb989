//! Startup settings. Nothing is persisted: everything comes from the
//! environment or falls back to per-user defaults.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Overrides the directory log files are written to.
pub const LOG_DIR_ENV: &str = "SQLITE_BROWSER_LOG_DIR";
/// Log filter directive, checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "SQLITE_BROWSER_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_dir: PathBuf,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_dir = lookup(LOG_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_log_dir);

        let log_filter = lookup(LOG_FILTER_ENV)
            .or_else(|| lookup("RUST_LOG"))
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            log_dir,
            log_filter,
        }
    }
}

/// Per-user data directory, or `./logs` when no home directory is known.
fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "sqlite-browser")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}
