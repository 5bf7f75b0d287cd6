//! core::verify
//!
//! Fast structural verification of a commit graph.
//!
//! Run after importing a tree and after every engine command. A failed
//! check after a command makes the engine restore the pre-command state.
//!
//! # Invariants
//!
//! - Never mutates the graph
//! - Must be deterministic

use super::graph::{CommitGraph, HeadTarget};
use super::types::CommitId;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors from verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("expected exactly one root commit, found {0}")]
    RootCount(usize),

    #[error("commit {commit} names missing parent {parent}")]
    DanglingParent { commit: CommitId, parent: CommitId },

    #[error("cycle detected through commit {0}")]
    CycleDetected(CommitId),

    #[error("{kind} {name} targets missing commit {target}")]
    DanglingRef {
        kind: &'static str,
        name: String,
        target: CommitId,
    },

    #[error("HEAD targets missing {0}")]
    DanglingHead(String),

    #[error("branch {branch} tracks missing branch {remote}")]
    DanglingTracking { branch: String, remote: String },

    #[error("ref table has {actual} entries, expected {expected}")]
    RefTableMismatch { expected: usize, actual: usize },

    #[error("children index of {0} disagrees with parent lists")]
    ChildrenMismatch(CommitId),
}

/// Result of fast verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Check the structural invariants of a graph.
pub fn fast_verify(graph: &CommitGraph) -> VerifyResult {
    let mut errors = Vec::new();

    let roots = graph.commits().filter(|c| c.is_root()).count();
    if roots != 1 {
        errors.push(VerifyError::RootCount(roots));
    }

    let mut expected_children: HashMap<CommitId, HashSet<CommitId>> = HashMap::new();
    for commit in graph.commits() {
        for parent in &commit.parents {
            if !graph.contains_commit(parent) {
                errors.push(VerifyError::DanglingParent {
                    commit: commit.id,
                    parent: *parent,
                });
            }
            expected_children.entry(*parent).or_default().insert(commit.id);
        }
    }
    for commit in graph.commits() {
        let indexed: HashSet<CommitId> = graph.children_of(&commit.id).copied().collect();
        let expected = expected_children.remove(&commit.id).unwrap_or_default();
        if indexed != expected {
            errors.push(VerifyError::ChildrenMismatch(commit.id));
        }
    }

    if let Some(id) = find_cycle(graph) {
        errors.push(VerifyError::CycleDetected(id));
    }

    for branch in graph.branches() {
        if !graph.contains_commit(&branch.target) {
            errors.push(VerifyError::DanglingRef {
                kind: "branch",
                name: branch.name.clone(),
                target: branch.target,
            });
        }
        if let Some(remote) = &branch.remote_tracking {
            if graph.branch(remote).is_none() {
                errors.push(VerifyError::DanglingTracking {
                    branch: branch.name.clone(),
                    remote: remote.clone(),
                });
            }
        }
    }
    for tag in graph.tags() {
        if !graph.contains_commit(&tag.target) {
            errors.push(VerifyError::DanglingRef {
                kind: "tag",
                name: tag.name.clone(),
                target: tag.target,
            });
        }
    }

    let head_ok = match &graph.head().target {
        HeadTarget::Branch(name) => graph.branch(name).is_some(),
        HeadTarget::Commit(id) => graph.contains_commit(id),
    };
    if !head_ok {
        errors.push(VerifyError::DanglingHead(graph.head().target.to_string()));
    }

    let expected = graph.commits().count() + graph.branches().count() + graph.tags().count() + 1;
    if graph.ref_count() != expected {
        errors.push(VerifyError::RefTableMismatch {
            expected,
            actual: graph.ref_count(),
        });
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}

/// Iterative three-color DFS over parent edges.
fn find_cycle(graph: &CommitGraph) -> Option<CommitId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }
    let mut marks: HashMap<CommitId, Mark> = HashMap::new();

    for commit in graph.commits() {
        if marks.contains_key(&commit.id) {
            continue;
        }
        let mut stack: Vec<(CommitId, usize)> = vec![(commit.id, 0)];
        marks.insert(commit.id, Mark::Open);
        while let Some((id, next)) = stack.last().copied() {
            let parents = graph.parents_of(&id);
            if next < parents.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let parent = parents[next];
                match marks.get(&parent) {
                    Some(Mark::Open) => return Some(parent),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(parent, Mark::Open);
                        stack.push((parent, 0));
                    }
                }
            } else {
                marks.insert(id, Mark::Done);
                stack.pop();
            }
        }
    }
    None
}
