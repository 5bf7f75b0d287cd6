//! remote
//!
//! The origin peer and synchronization between it and the local graph.
//!
//! # Architecture
//!
//! An origin is a second [`CommitGraph`] held by the [`Repository`]. Commits
//! keep their ids when they travel in either direction, and ids are always
//! allocated against both graphs, so an id never names two different commits.
//!
//! The local graph mirrors every origin branch `name` with a remote-tracking
//! branch `o/name`. Local branches may follow one of those with a tracking
//! link.
//!
//! # Modules
//!
//! - this module: origin creation, teamwork simulation, shared ancestry walks
//! - [`sync`]: fetch and push
//!
//! # Invariants
//!
//! - Every operation plans first and mutates only after all checks pass
//! - A commit id present in both graphs names the same parents in both

pub mod sync;

pub use sync::{fetch, push, FetchOptions, FetchReport, FetchSpec, PushReport, PushSpec};

use crate::core::algo;
use crate::core::graph::{CommitGraph, CommitMeta, GraphError, HeadTarget, Resolved};
use crate::core::repo::Repository;
use crate::core::types::{CommitId, TypeError, REMOTE_PREFIX, TRUNK};
use crate::tree::serialize::{build_graph, export_for_branch, export_graph};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from origin management and synchronization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("this command requires an origin; clone first")]
    NoOrigin,

    #[error("an origin already exists")]
    OriginExists,

    #[error("{branch} is not upstream of the source; fetch or merge first, or use --force")]
    NonFastForward { branch: String },

    #[error("cannot delete {0} on the remote")]
    ProtectedBranch(String),

    #[error("cannot fetch into {0} while it is checked out")]
    CheckedOut(String),

    #[error("{0} is not a remote branch")]
    NotARemote(String),

    #[error("{0} is not a branch on the remote")]
    NotABranch(String),

    #[error("{0} is not tracking a remote branch; cannot tell where to sync")]
    NotTracking(String),

    #[error("tags are not allowed as sources for pushing: {0}")]
    TagPush(String),

    #[error("cannot delete remote branch {0} because it does not exist")]
    DeleteMissing(String),

    #[error("commit {0} shares no history with the other side")]
    NoSharedHistory(CommitId),

    #[error("failed to seed origin: {0}")]
    Seed(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Name(#[from] TypeError),
}

/// Which part of the local graph a new origin starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginSeed {
    /// Only what the trunk can reach, with the trunk as the single branch.
    Trunk,
    /// The whole local graph.
    Full,
}

/// A tracking link made while attaching an origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLink {
    pub local: String,
    pub remote: String,
}

/// The local name mirroring an origin branch.
pub fn remote_name(branch: &str) -> String {
    format!("{REMOTE_PREFIX}{branch}")
}

/// The origin branch a remote-tracking name mirrors.
pub fn origin_name(remote: &str) -> Option<&str> {
    remote.strip_prefix(REMOTE_PREFIX)
}

/// Borrow the origin or fail.
pub fn origin_of(repo: &Repository) -> Result<&CommitGraph, SyncError> {
    repo.origin.as_ref().ok_or(SyncError::NoOrigin)
}

/// Walk `walk` upward from `start` to the nearest commit `target` has.
///
/// Single parents are followed directly. At a merge both parent lines are
/// searched and the two hits are reconciled with a common ancestor search
/// in `target`. Each commit is resolved at most once per call.
pub fn shared_ancestor(
    walk: &CommitGraph,
    target: &CommitGraph,
    start: CommitId,
) -> Result<CommitId, SyncError> {
    shared_ancestor_memo(walk, target, start, &mut HashMap::new())
}

fn shared_ancestor_memo(
    walk: &CommitGraph,
    target: &CommitGraph,
    start: CommitId,
    resolved: &mut HashMap<CommitId, CommitId>,
) -> Result<CommitId, SyncError> {
    let mut path = Vec::new();
    let mut current = start;
    let found = loop {
        if let Some(hit) = resolved.get(&current) {
            break *hit;
        }
        if target.contains_commit(&current) {
            break current;
        }
        path.push(current);
        match walk.parents_of(&current) {
            [] => return Err(SyncError::NoSharedHistory(start)),
            [only] => current = *only,
            [left, right, ..] => {
                let (left, right) = (*left, *right);
                let left = shared_ancestor_memo(walk, target, left, resolved)?;
                let right = shared_ancestor_memo(walk, target, right, resolved)?;
                break algo::common_ancestor(target, left, right, true)?;
            }
        }
    };
    for id in path {
        resolved.insert(id, found);
    }
    Ok(found)
}

/// Create an origin from the local graph.
///
/// Returns the tracking links made for local branches.
///
/// # Errors
///
/// [`SyncError::OriginExists`] when the repository already has one.
pub fn make_origin(repo: &mut Repository, seed: OriginSeed) -> Result<Vec<TrackingLink>, SyncError> {
    if repo.origin.is_some() {
        return Err(SyncError::OriginExists);
    }
    let tree = match seed {
        OriginSeed::Trunk => {
            export_for_branch(&repo.local, TRUNK).map_err(|e| SyncError::Seed(e.to_string()))?
        }
        OriginSeed::Full => export_graph(&repo.local),
    };
    let origin = build_graph(&tree, true).map_err(|e| SyncError::Seed(e.to_string()))?;
    info!(seed = ?seed, branches = origin.branches().count(), "origin created");
    attach_origin(repo, origin)
}

/// Install `origin` and mirror every origin branch not yet mirrored locally.
///
/// Each new `o/name` lands on the nearest commit both sides share. A local
/// branch of the same name starts tracking it.
pub fn attach_origin(
    repo: &mut Repository,
    origin: CommitGraph,
) -> Result<Vec<TrackingLink>, SyncError> {
    if repo.origin.is_some() {
        return Err(SyncError::OriginExists);
    }

    let mut planned = Vec::new();
    for branch in origin.branches() {
        let remote = remote_name(&branch.name);
        if repo.local.has_ref(&remote) {
            continue;
        }
        let at = shared_ancestor(&origin, &repo.local, branch.target)?;
        planned.push((branch.name.clone(), remote, at));
    }

    let mut links = Vec::new();
    for (name, remote, at) in planned {
        repo.local.create_branch(&remote, at)?;
        if repo.local.branch(&name).is_some() {
            repo.local.set_tracking(&name, Some(remote.clone()))?;
            links.push(TrackingLink {
                local: name,
                remote,
            });
        }
    }
    repo.origin = Some(origin);
    Ok(links)
}

/// Make `count` commits on an origin branch, as if someone else pushed them.
///
/// Origin HEAD moves to the branch. Ids come from the shared allocator.
pub fn fake_teamwork(
    repo: &mut Repository,
    branch: &str,
    count: usize,
    meta: impl Fn() -> CommitMeta,
) -> Result<Vec<CommitId>, SyncError> {
    let origin = origin_of(repo)?;
    match origin.branch(branch) {
        Some(b) if !b.is_remote() => {}
        _ => return Err(SyncError::NotABranch(branch.to_string())),
    }

    let mut made = Vec::with_capacity(count);
    for _ in 0..count {
        let id = repo.fresh_id();
        let origin = repo.origin.as_mut().ok_or(SyncError::NoOrigin)?;
        origin.set_head(HeadTarget::Branch(branch.to_string()))?;
        let parent = origin.head_commit()?;
        origin.create_commit(id, vec![parent], meta())?;
        origin.set_target_location(&Resolved::Head, id)?;
        made.push(id);
    }
    debug!(branch, commits = ?made, "teamwork on origin");
    Ok(made)
}

/// Text listing of configured remotes.
pub fn describe_remotes(verbose: bool) -> String {
    if verbose {
        [
            "origin (fetch)",
            "\tgit@github.com:pcottle/foo.git",
            "",
            "origin (push)",
            "\tgit@github.com:pcottle/foo.git",
        ]
        .join("\n")
    } else {
        "origin".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::serialize::default_tree;

    fn id(s: &str) -> CommitId {
        s.parse().unwrap()
    }

    fn repo() -> Repository {
        Repository::new(build_graph(&default_tree(), false).unwrap())
    }

    #[test]
    fn trunk_seed_mirrors_master_and_tracks_it() {
        let mut repo = repo();
        let links = make_origin(&mut repo, OriginSeed::Trunk).unwrap();
        assert_eq!(
            links,
            vec![TrackingLink {
                local: "master".into(),
                remote: "o/master".into()
            }]
        );
        assert_eq!(repo.local.branch("o/master").unwrap().target, id("C1"));
        let origin = repo.origin.as_ref().unwrap();
        assert!(origin.is_origin());
        assert_eq!(origin.branch("master").unwrap().target, id("C1"));
    }

    #[test]
    fn trunk_seed_leaves_side_branches_behind() {
        let mut repo = repo();
        repo.local.create_branch("side", id("C0")).unwrap();
        make_origin(&mut repo, OriginSeed::Trunk).unwrap();
        assert!(repo.origin.as_ref().unwrap().branch("side").is_none());
        assert!(repo.local.branch("o/side").is_none());
    }

    #[test]
    fn second_origin_is_rejected() {
        let mut repo = repo();
        make_origin(&mut repo, OriginSeed::Full).unwrap();
        assert_eq!(
            make_origin(&mut repo, OriginSeed::Full),
            Err(SyncError::OriginExists)
        );
    }

    #[test]
    fn teamwork_allocates_ids_unused_locally() {
        let mut repo = repo();
        make_origin(&mut repo, OriginSeed::Trunk).unwrap();
        let made = fake_teamwork(&mut repo, "master", 2, || CommitMeta::now("m", "t")).unwrap();
        assert_eq!(made, vec![id("C2"), id("C3")]);
        let origin = repo.origin.as_ref().unwrap();
        assert_eq!(origin.branch("master").unwrap().target, id("C3"));
        assert!(!repo.local.contains_commit(&id("C2")));
    }

    #[test]
    fn shared_ancestor_walks_past_unknown_commits() {
        let mut repo = repo();
        make_origin(&mut repo, OriginSeed::Trunk).unwrap();
        fake_teamwork(&mut repo, "master", 2, || CommitMeta::now("m", "t")).unwrap();
        let origin = repo.origin.as_ref().unwrap();
        assert_eq!(
            shared_ancestor(origin, &repo.local, id("C3")).unwrap(),
            id("C1")
        );
    }

    #[test]
    fn shared_ancestor_handles_deep_merge_ladders() {
        let mut repo = repo();
        make_origin(&mut repo, OriginSeed::Trunk).unwrap();
        let meta = || CommitMeta::now("m", "t");
        let mut tip = id("C1");
        for _ in 0..48 {
            let left = repo.create_commit(vec![tip], None, meta()).unwrap();
            let right = repo.create_commit(vec![tip], None, meta()).unwrap();
            tip = repo.create_commit(vec![left, right], None, meta()).unwrap();
        }
        let origin = repo.origin.as_ref().unwrap();
        assert_eq!(shared_ancestor(&repo.local, origin, tip).unwrap(), id("C1"));
    }

    #[test]
    fn remote_names_round_trip_through_prefix() {
        assert_eq!(remote_name("bugFix"), "o/bugFix");
        assert_eq!(origin_name("o/bugFix"), Some("bugFix"));
        assert_eq!(origin_name("bugFix"), None);
    }
}
