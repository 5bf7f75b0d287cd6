//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of searching
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use crate::tree::ComparePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitsim - a commit-graph simulator for git and hg commands
#[derive(Parser, Debug)]
#[command(name = "gitsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of searching the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a script of commands against a tree
    #[command(
        name = "run",
        long_about = "Run a script of structured commands against a commit tree.\n\n\
            The script is a JSON array of commands, each with a dialect (git or hg), a \
            method, positional arguments and an options map. Commands run in order; the \
            first error stops the script and nothing after it runs. The final tree is \
            printed as JSON, or written to --out.",
        after_help = "\
SCRIPT FORMAT:
    [
      {\"dialect\": \"git\", \"method\": \"checkout\", \"optionsMap\": {\"-b\": [\"bugFix\"]}},
      {\"dialect\": \"git\", \"method\": \"commit\"},
      {\"dialect\": \"git\", \"method\": \"merge\", \"generalArgs\": [\"master\"]}
    ]

EXAMPLES:
    # Start from the default two-commit tree
    gitsim run --script level.json

    # Start from a saved tree and keep the result
    gitsim run --tree start.json --script level.json --out end.json"
    )]
    Run {
        /// Starting tree; the default tree when omitted
        #[arg(long, value_name = "FILE")]
        tree: Option<PathBuf>,

        /// JSON array of commands
        #[arg(long, value_name = "FILE")]
        script: PathBuf,

        /// Write the final tree here instead of printing it
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Print each outcome as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Compare a tree against a goal
    #[command(
        name = "compare",
        after_help = "\
POLICIES:
    default, only-master, all-branches-enforce-cleanup, only-branches,
    all-branches-hash-agnostic, only-master-hash-agnostic,
    only-master-hash-agnostic-with-asserts"
    )]
    Compare {
        /// The goal tree
        #[arg(long, value_name = "FILE")]
        goal: PathBuf,

        /// The tree to check
        #[arg(long, value_name = "FILE")]
        tree: PathBuf,

        /// Comparison policy
        #[arg(long, default_value = "default")]
        policy: ComparePolicy,

        /// Separate policy for the nested origin trees
        #[arg(long)]
        origin_policy: Option<ComparePolicy>,
    },

    /// Print the default starting tree
    #[command(name = "default-tree")]
    DefaultTree {
        /// Indent the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
EXAMPLES:
    # Bash
    gitsim completion bash > /etc/bash_completion.d/gitsim

    # Zsh
    gitsim completion zsh > \"${fpath[1]}/_gitsim\""
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells supported for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
