//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. An explicit path (from `--config`), which must exist
//! 2. `$GITSIM_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitsim/config.toml`
//! 4. `~/.gitsim/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitsim::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//! println!("Author: {}", config.author());
//! println!("Name limit: {}", config.max_branch_name_len());
//! ```

pub mod schema;

pub use schema::SimConfig;

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name length before truncation.
pub const DEFAULT_MAX_BRANCH_NAME_LEN: usize = 9;

/// Default commit author.
pub const DEFAULT_AUTHOR: &str = "Peter Cottle";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Raw file contents
    pub file: SimConfig,
    /// Path the file was loaded from
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or if a config file
    /// exists but cannot be parsed or fails validation. A missing default
    /// file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let found = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::search(&mut warnings),
        };

        let config = match found {
            Some(path) => {
                let file = Self::read(&path)?;
                file.validate()?;
                Config {
                    file,
                    path: Some(path),
                }
            }
            None => Config::default(),
        };

        Ok(ConfigLoadResult { config, warnings })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: SimConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Config { file, path: None })
    }

    fn search(warnings: &mut Vec<ConfigWarning>) -> Option<PathBuf> {
        // 1. Check $GITSIM_CONFIG
        if let Ok(path) = std::env::var("GITSIM_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warnings.push(ConfigWarning {
                message: "GITSIM_CONFIG points at a missing file; using defaults".to_string(),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/gitsim/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitsim/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.gitsim/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".gitsim/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    fn read(path: &Path) -> Result<SimConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Longest branch or tag name before truncation.
    ///
    /// Defaults to 9.
    pub fn max_branch_name_len(&self) -> usize {
        self.file
            .max_branch_name_len
            .unwrap_or(DEFAULT_MAX_BRANCH_NAME_LEN)
    }

    /// Author recorded on new commits.
    pub fn author(&self) -> &str {
        self.file.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }

    /// Whether committing on a detached HEAD attaches a warning.
    ///
    /// Defaults to `true`.
    pub fn detached_commit_warning(&self) -> bool {
        self.file
            .warnings
            .as_ref()
            .and_then(|w| w.detached_commit)
            .unwrap_or(true)
    }

    /// Whether the engine verifies invariants after each command.
    ///
    /// Defaults to `true`.
    pub fn verify_after_command(&self) -> bool {
        self.file
            .engine
            .as_ref()
            .and_then(|e| e.verify)
            .unwrap_or(true)
    }

    /// Get the path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
