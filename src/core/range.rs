//! core::range
//!
//! Log-style revision ranges.
//!
//! A range is built from specifiers:
//! - `A..B` includes ancestors of `B` and excludes ancestors of `A`
//! - `^A` excludes ancestors of `A`
//! - `A` includes ancestors of `A`
//!
//! The result is every included commit that is not excluded, newest first.

use super::algo::upstream_set;
use super::graph::{CommitGraph, GraphError};
use super::types::CommitId;
use std::collections::HashSet;

/// Parsed revision specifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionRange {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl RevisionRange {
    /// Sort specifiers into includes and excludes.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Self {
        let mut range = Self::default();
        for spec in specs {
            let spec = spec.as_ref();
            if let Some((from, to)) = spec.split_once("..") {
                range.exclude.push(from.to_string());
                range.include.push(to.to_string());
            } else if let Some(rest) = spec.strip_prefix('^') {
                range.exclude.push(rest.to_string());
            } else {
                range.include.push(spec.to_string());
            }
        }
        range
    }

    /// Resolve against a graph, newest first.
    ///
    /// # Errors
    ///
    /// Fails when any specifier does not resolve.
    pub fn resolve(&self, graph: &CommitGraph) -> Result<Vec<CommitId>, GraphError> {
        let mut excluded = HashSet::new();
        for spec in &self.exclude {
            excluded.extend(upstream_set(graph, graph.commit_from_ref(spec)?));
        }
        let mut included = HashSet::new();
        for spec in &self.include {
            included.extend(
                upstream_set(graph, graph.commit_from_ref(spec)?)
                    .into_iter()
                    .filter(|id| !excluded.contains(id)),
            );
        }
        let mut out: Vec<CommitId> = included.into_iter().collect();
        out.sort_unstable_by(|a, b| b.cmp(a));
        Ok(out)
    }
}
