//! core::algo
//!
//! Pure traversals over a [`CommitGraph`].
//!
//! Nothing in here mutates a graph. Rebase, cherry-pick and the sync engine
//! build their plans from these functions and only then touch the graph.
//!
//! # Ordering
//!
//! Two orderings matter to callers:
//! - [`diff_from_set`] returns ids in descending canonical order (newest first)
//! - [`order_for_replay`] widens a satisfied frontier by repeated full scans
//!   and keeps the input order within each scan

use super::graph::{CommitGraph, GraphError};
use super::types::CommitId;
use std::collections::{HashSet, VecDeque};

/// Every ancestor of `start`, including `start` itself.
///
/// Breadth-first over all parents, not just the first.
pub fn upstream_set(graph: &CommitGraph, start: CommitId) -> HashSet<CommitId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if seen.insert(current) {
            queue.extend(graph.parents_of(&current).iter().copied());
        }
    }
    seen
}

/// Every descendant of `start`, including `start` itself.
pub fn downstream_set(graph: &CommitGraph, start: CommitId) -> HashSet<CommitId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if seen.insert(current) {
            queue.extend(graph.children_of(&current).copied());
        }
    }
    seen
}

/// Whether `ancestor` is reachable from `descendant` through parents.
///
/// Every commit is upstream of itself.
pub fn is_upstream_of(graph: &CommitGraph, ancestor: CommitId, descendant: CommitId) -> bool {
    ancestor == descendant || upstream_set(graph, descendant).contains(&ancestor)
}

/// The first ancestor of `cousin` that is also an ancestor of `ancestor`.
///
/// # Errors
///
/// Returns [`GraphError::UnorderedAncestor`] when `cousin` is itself upstream
/// of `ancestor`, unless `allow_unordered` is set.
pub fn common_ancestor(
    graph: &CommitGraph,
    ancestor: CommitId,
    cousin: CommitId,
    allow_unordered: bool,
) -> Result<CommitId, GraphError> {
    if !allow_unordered && is_upstream_of(graph, cousin, ancestor) {
        return Err(GraphError::UnorderedAncestor { ancestor, cousin });
    }

    let upstream = upstream_set(graph, ancestor);
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([cousin]);
    while let Some(current) = queue.pop_front() {
        if upstream.contains(&current) {
            return Ok(current);
        }
        if seen.insert(current) {
            queue.extend(graph.parents_of(&current).iter().copied());
        }
    }
    // Every commit shares the root, so this only happens on a malformed graph.
    Err(GraphError::RefNotFound(format!(
        "common ancestor of {ancestor} and {cousin}"
    )))
}

/// Ancestors of `start` that are not in `stop`, newest first.
///
/// The walk never enters `stop`, so ancestors hidden behind a stop commit
/// are excluded even when they are not in `stop` themselves.
pub fn diff_from_set(
    graph: &CommitGraph,
    stop: &HashSet<CommitId>,
    start: CommitId,
) -> Vec<CommitId> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if stop.contains(&current) || !seen.insert(current) {
            continue;
        }
        queue.extend(graph.parents_of(&current).iter().copied());
    }
    let mut out: Vec<CommitId> = seen.into_iter().collect();
    out.sort_unstable_by(|a, b| b.cmp(a));
    out
}

/// Order commits so every commit comes after all of its parents.
///
/// `source` supplies parent lists; `satisfied` holds ids already present at
/// the destination. Each pass scans the whole pending list and moves every
/// commit whose parents are all satisfied, keeping pending order within the
/// pass. Passes repeat until nothing is pending.
///
/// # Errors
///
/// Returns [`GraphError::ReplayStalled`] when a pass makes no progress.
///
/// # Example
///
/// ```
/// use gitsim::core::algo::order_for_replay;
/// use gitsim::tree::serialize::{build_graph, TreeSnapshot};
/// use std::collections::HashSet;
///
/// let tree = TreeSnapshot::from_json(r#"{
///   "branches": {"master": {"id": "master", "target": "C3"}},
///   "commits": {
///     "C0": {"id": "C0", "parents": [], "rootCommit": true},
///     "C1": {"id": "C1", "parents": ["C0"]},
///     "C2": {"id": "C2", "parents": ["C1"]},
///     "C3": {"id": "C3", "parents": ["C2"]}
///   },
///   "HEAD": {"id": "HEAD", "target": "master"}
/// }"#).unwrap();
/// let graph = build_graph(&tree, false).unwrap();
/// let pending = vec!["C3".parse().unwrap(), "C2".parse().unwrap()];
/// let satisfied: HashSet<_> = ["C0", "C1"].iter().map(|s| s.parse().unwrap()).collect();
/// let order = order_for_replay(&graph, pending, satisfied).unwrap();
/// assert_eq!(order.iter().map(|c| c.to_string()).collect::<Vec<_>>(), ["C2", "C3"]);
/// ```
pub fn order_for_replay(
    source: &CommitGraph,
    mut pending: Vec<CommitId>,
    mut satisfied: HashSet<CommitId>,
) -> Result<Vec<CommitId>, GraphError> {
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready: Vec<CommitId> = pending
            .iter()
            .filter(|id| {
                source
                    .parents_of(id)
                    .iter()
                    .all(|parent| satisfied.contains(parent))
            })
            .copied()
            .collect();
        if ready.is_empty() {
            return Err(GraphError::ReplayStalled(pending.len()));
        }
        pending.retain(|id| !ready.contains(id));
        satisfied.extend(ready.iter().copied());
        ordered.extend(ready);
    }
    Ok(ordered)
}

/// The nearest tag reachable through parents, with the number of commits
/// walked before reaching it.
///
/// Newer commits are explored first.
pub fn nearest_tag(graph: &CommitGraph, start: CommitId) -> Option<(String, usize)> {
    let mut frontier = vec![start];
    let mut seen = HashSet::new();
    let mut distance = 0;
    while let Some(current) = frontier.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(tag) = graph.tags().find(|t| t.target == current) {
            return Some((tag.name.clone(), distance));
        }
        distance += 1;
        frontier.extend(graph.parents_of(&current).iter().copied());
        frontier.sort_unstable();
    }
    None
}
