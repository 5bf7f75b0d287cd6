//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results go
//! to stdout; warnings and errors go to stderr so a printed tree can be piped.

use crate::core::graph::Mutation;
use crate::core::repo::{Change, Side};
use crate::engine::{Outcome, Status};
use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// One line per change, e.g. `local commit_created C2`.
pub fn format_changes(outcome: &Outcome) -> Vec<String> {
    outcome.changes.iter().map(format_change).collect()
}

fn format_change(change: &Change) -> String {
    let side = match change.side {
        Side::Local => "local",
        Side::Origin => "origin",
    };
    let (kind, subject) = match &change.mutation {
        Mutation::CommitCreated { id, .. } => ("commit_created", id.to_string()),
        Mutation::CommitPruned { id } => ("commit_pruned", id.to_string()),
        Mutation::ParentsRewritten { id, .. } => ("parents_rewritten", id.to_string()),
        Mutation::RefCreated { name, .. } => ("ref_created", name.clone()),
        Mutation::RefMoved { name, .. } => ("ref_moved", name.clone()),
        Mutation::RefDeleted { name } => ("ref_deleted", name.clone()),
        Mutation::TrackingChanged { branch, .. } => ("tracking_changed", branch.clone()),
    };
    format!("{side} {kind} {subject}")
}

/// Human-readable rendering of one command's outcome.
pub fn format_outcome(label: &str, outcome: &Outcome) -> String {
    let status = match outcome.status {
        Status::Success => "ok",
        Status::NoOp => "no-op",
        Status::Paused => "paused",
    };
    let mut lines = vec![format!("$ {label} [{status}]")];
    if let Some(message) = outcome.message.as_deref().filter(|m| !m.is_empty()) {
        lines.extend(message.lines().map(|l| format!("  {l}")));
    }
    if let Some(plan) = &outcome.plan {
        let ids: Vec<String> = plan.candidates.iter().map(ToString::to_string).collect();
        lines.push(format!(
            "  rebase {} onto {}: pick from {}",
            plan.branch,
            plan.target,
            ids.join(", ")
        ));
    }
    lines.join("\n")
}
