//! cli
//!
//! Command-line interface layer for gitsim.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands requests
//! to the [`crate::engine`]. All graph changes flow through the engine's
//! execute-verify cycle.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::core::config::Config;
use crate::engine::EngineConfig;
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

/// Settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub verbosity: Verbosity,
    pub engine: EngineConfig,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let loaded = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    if let Some(path) = loaded.config.loaded_from() {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    let ctx = Context {
        verbosity,
        engine: EngineConfig::from(&loaded.config),
    };
    commands::dispatch(cli.command, &ctx)
}

/// Log to stderr. `RUST_LOG` wins; otherwise `--debug` selects debug level.
fn init_tracing(debug: bool) {
    let fallback = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
