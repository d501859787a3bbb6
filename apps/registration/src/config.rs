//! Configuration for the registration binary.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems caught before the session starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A path setting was set to an empty string
    #[error("{0} must not be empty")]
    EmptyPath(&'static str),

    /// The output path names an existing directory
    #[error("output path {} is a directory", .0.display())]
    OutputIsDirectory(PathBuf),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the draft storage (`CONFPASS_STORAGE_DIR`)
    pub storage_dir: PathBuf,
    /// Where the rendered page is written (`CONFPASS_OUTPUT`)
    pub output: PathBuf,
    /// Session script to replay (`CONFPASS_SCRIPT`); the built-in scenario runs without one
    pub script: Option<PathBuf>,
    /// Log filter (`RUST_LOG`)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".confpass"),
            output: PathBuf::from("ticket.html"),
            script: None,
            log_level: "info,confpass_registration=debug".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            storage_dir: lookup("CONFPASS_STORAGE_DIR")
                .map_or(defaults.storage_dir, PathBuf::from),
            output: lookup("CONFPASS_OUTPUT").map_or(defaults.output, PathBuf::from),
            script: lookup("CONFPASS_SCRIPT")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Checks the loaded values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for empty paths or an output path that is a directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("CONFPASS_STORAGE_DIR"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("CONFPASS_OUTPUT"));
        }
        if self.output.is_dir() {
            return Err(ConfigError::OutputIsDirectory(self.output.clone()));
        }
        Ok(())
    }
}
