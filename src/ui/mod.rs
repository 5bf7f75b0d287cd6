//! ui
//!
//! User-facing text.
//!
//! # Modules
//!
//! - [`messages`] - Wording of engine advisories and results
//! - [`output`] - Terminal output for the command-line binary
//!
//! # Design
//!
//! The engine produces structured notices and outcomes; this module owns
//! how they read. All terminal output goes through [`output`] so the quiet
//! flag is honored everywhere.

pub mod messages;
pub mod output;
