//! core
//!
//! Core domain types, graph storage, and algorithms for the simulator.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CommitId, validated names, reserved names
//! - [`graph`] - Commit graph arena, refs, resolution, mutation journal
//! - [`algo`] - Ancestor/descendant search, common ancestor, replay order
//! - [`range`] - Log-style revision ranges
//! - [`repo`] - The local graph paired with its origin
//! - [`verify`] - Fast verification of graph invariants
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Commit ids are parsed once and carried as numbers
//! - Traversals never mutate; mutations never traverse more than they must
//! - All verification is deterministic

pub mod algo;
pub mod config;
pub mod graph;
pub mod range;
pub mod repo;
pub mod types;
pub mod verify;
