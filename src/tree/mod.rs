//! tree
//!
//! The canonical tree format and goal comparison.
//!
//! # Modules
//!
//! - [`serialize`] - Flat-map JSON export and import of commit graphs
//! - [`compare`] - Goal matching under selectable policies
//!
//! A tree is the only shape graphs take outside the engine: saving,
//! restoring, defining goals, and seeding an origin all go through
//! [`serialize::TreeSnapshot`].

pub mod compare;
pub mod serialize;

pub use compare::{trees_match, ComparePolicy, GoalSpec};
pub use serialize::{build_graph, default_tree, export_graph, TreeError, TreeSnapshot};
