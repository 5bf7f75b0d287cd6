//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order of precedence:
//! 1. `--config <path>` on the command line
//! 2. `$GITSIM_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitsim/config.toml`
//! 4. `~/.gitsim/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing so a bad file fails at load
//! time instead of in the middle of a command.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Simulator configuration.
///
/// # Example
///
/// ```toml
/// max_branch_name_len = 12
/// author = "Ada"
///
/// [warnings]
/// detached_commit = false
///
/// [engine]
/// verify = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Longest branch or tag name before truncation
    pub max_branch_name_len: Option<usize>,

    /// Author recorded on new commits
    pub author: Option<String>,

    /// Advisory toggles
    pub warnings: Option<WarningsConfig>,

    /// Engine behavior
    pub engine: Option<EngineSection>,
}

impl SimConfig {
    /// Smallest allowed truncation limit.
    pub const MIN_NAME_LEN: usize = 2;

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(len) = self.max_branch_name_len {
            if len < Self::MIN_NAME_LEN {
                return Err(ConfigError::InvalidValue(format!(
                    "max_branch_name_len must be at least {}, got {}",
                    Self::MIN_NAME_LEN,
                    len
                )));
            }
        }

        if let Some(author) = &self.author {
            if author.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "author cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Which advisories are attached to command outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WarningsConfig {
    /// Warn when committing on a detached HEAD
    pub detached_commit: Option<bool>,
}

/// Engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    /// Verify graph invariants after every command
    pub verify: Option<bool>,
}
