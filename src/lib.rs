//! gitsim - a commit-graph simulator for git and hg commands
//!
//! gitsim models a repository as a graph of commit ids with branches, tags
//! and HEAD, and runs structured git or hg commands against it. There are no
//! files and no contents; commits exist only as ids, parents and messages.
//! An optional origin graph stands in for a remote, and whole graphs can be
//! saved, restored and compared as JSON trees.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Parses commands and runs them with rollback and verification
//! - [`remote`] - The origin graph: clone, fetch, push, teamwork simulation
//! - [`core`] - Domain types, the commit graph, algorithms, configuration
//! - [`tree`] - Tree serialization and goal comparison
//! - [`ui`] - Message wording and terminal output
//!
//! # Correctness Invariants
//!
//! gitsim maintains the following invariants:
//!
//! 1. Every graph has exactly one root and no parent cycles
//! 2. Every ref targets an existing commit
//! 3. A commit id names the same commit in the local graph and the origin
//! 4. A failed command leaves the repository unchanged

pub mod cli;
pub mod core;
pub mod engine;
pub mod remote;
pub mod tree;
pub mod ui;
