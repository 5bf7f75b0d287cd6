//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Reads and parses its input files
//! 2. Calls the engine or the tree layer
//! 3. Formats and displays output
//!
//! Handlers do NOT touch a graph directly.

mod compare;
mod completion;
mod default_tree;
mod run;

// Re-export command functions for testing and direct invocation
pub use compare::compare;
pub use completion::completion;
pub use default_tree::default_tree;
pub use run::{label, run};

use super::Context;
use crate::cli::args::Command;
use crate::tree::TreeSnapshot;
use anyhow::{Context as _, Result};
use std::path::Path;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Run {
            tree,
            script,
            out,
            json,
        } => run::run(ctx, tree.as_deref(), &script, out.as_deref(), json),
        Command::Compare {
            goal,
            tree,
            policy,
            origin_policy,
        } => compare::compare(ctx, &goal, &tree, policy, origin_policy),
        Command::DefaultTree { pretty } => default_tree::default_tree(pretty),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Read and parse a tree file.
pub(crate) fn read_tree(path: &Path) -> Result<TreeSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file '{}'", path.display()))?;
    TreeSnapshot::from_json(&text)
        .with_context(|| format!("failed to parse tree file '{}'", path.display()))
}
