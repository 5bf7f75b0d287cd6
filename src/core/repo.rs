//! core::repo
//!
//! The local graph plus its optional origin peer.
//!
//! The pair owns id allocation. A fresh id must be unused in both graphs,
//! since commits travel between them with their ids intact.

use super::graph::{CommitGraph, CommitMeta, GraphError, Mutation};
use super::types::{CommitId, TypeError};
use serde::Serialize;

/// Which half of the pair a change happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Origin,
}

/// A recorded mutation plus where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub side: Side,
    #[serde(flatten)]
    pub mutation: Mutation,
}

/// A local commit graph and, once created, its origin.
#[derive(Debug, Clone)]
pub struct Repository {
    pub local: CommitGraph,
    pub origin: Option<CommitGraph>,
    next_number: u64,
}

impl Repository {
    /// Wrap a local graph with no origin.
    pub fn new(local: CommitGraph) -> Self {
        Self {
            local,
            origin: None,
            next_number: 0,
        }
    }

    /// Whether an id is used by either graph.
    pub fn id_taken(&self, id: &CommitId) -> bool {
        let name = id.to_string();
        self.local.has_ref(&name)
            || self
                .origin
                .as_ref()
                .map(|origin| origin.has_ref(&name))
                .unwrap_or(false)
    }

    /// Allocate the next unused `C<n>`.
    pub fn fresh_id(&mut self) -> CommitId {
        loop {
            let candidate = CommitId::new(self.next_number);
            self.next_number += 1;
            if !self.id_taken(&candidate) {
                return candidate;
            }
        }
    }

    /// The id a rewrite of `id` should get: the next free rewrite depth.
    pub fn rewritten_id(&self, id: CommitId) -> Result<CommitId, TypeError> {
        let mut candidate = id.bumped()?;
        while self.id_taken(&candidate) {
            candidate = candidate.bumped()?;
        }
        Ok(candidate)
    }

    /// Create a commit in the local graph.
    ///
    /// When `id` is `None` a fresh id is allocated.
    pub fn create_commit(
        &mut self,
        parents: Vec<CommitId>,
        id: Option<CommitId>,
        meta: CommitMeta,
    ) -> Result<CommitId, GraphError> {
        let id = match id {
            Some(id) => id,
            None => self.fresh_id(),
        };
        self.local.create_commit(id, parents, meta)
    }

    /// Drain both journals, local changes first.
    pub fn take_changes(&mut self) -> Vec<Change> {
        let mut changes: Vec<Change> = self
            .local
            .take_journal()
            .into_iter()
            .map(|mutation| Change {
                side: Side::Local,
                mutation,
            })
            .collect();
        if let Some(origin) = self.origin.as_mut() {
            changes.extend(origin.take_journal().into_iter().map(|mutation| Change {
                side: Side::Origin,
                mutation,
            }));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::serialize::{build_graph, default_tree};

    fn repo() -> Repository {
        Repository::new(build_graph(&default_tree(), false).unwrap())
    }

    #[test]
    fn fresh_ids_skip_existing_commits() {
        let mut repo = repo();
        assert_eq!(repo.fresh_id().to_string(), "C2");
        assert_eq!(repo.fresh_id().to_string(), "C3");
    }

    #[test]
    fn fresh_ids_skip_origin_commits() {
        let mut repo = repo();
        let mut origin = build_graph(&default_tree(), true).unwrap();
        origin
            .create_commit(
                "C2".parse().unwrap(),
                vec!["C1".parse().unwrap()],
                CommitMeta::now("m", "t"),
            )
            .unwrap();
        repo.origin = Some(origin);
        assert_eq!(repo.fresh_id().to_string(), "C3");
    }

    #[test]
    fn fresh_ids_skip_commits_created_with_explicit_ids() {
        let mut repo = repo();
        let c1 = "C1".parse().unwrap();
        repo.local
            .create_commit("C2".parse().unwrap(), vec![c1], CommitMeta::now("m", "t"))
            .unwrap();
        assert_eq!(repo.fresh_id().to_string(), "C3");
    }

    #[test]
    fn rewritten_ids_never_collide() {
        let mut repo = repo();
        let c1: CommitId = "C1".parse().unwrap();
        let first = repo.rewritten_id(c1).unwrap();
        repo.create_commit(vec![c1], Some(first), CommitMeta::now("m", "t"))
            .unwrap();
        let second = repo.rewritten_id(c1).unwrap();
        assert_eq!(first.to_string(), "C1'");
        assert_eq!(second.to_string(), "C1''");
    }

    #[test]
    fn changes_are_tagged_by_side() {
        let mut repo = repo();
        repo.local.take_journal();
        repo.create_commit(vec!["C1".parse().unwrap()], None, CommitMeta::now("m", "t"))
            .unwrap();
        let changes = repo.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].side, Side::Local);
    }
}
