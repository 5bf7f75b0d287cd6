//! remote::sync
//!
//! Fetch and push between the local graph and its origin.
//!
//! Both directions follow the same three steps:
//! 1. Resolve every source and destination and plan any branches that must
//!    be created, without touching either graph
//! 2. Check fast-forward safety and compute the commits missing on the
//!    receiving side, ordered so parents come first
//! 3. Replay those commits with their original ids and move the refs
//!
//! An error in steps 1 or 2 leaves both graphs untouched.

use super::{origin_name, origin_of, remote_name, shared_ancestor, SyncError, TrackingLink};
use crate::core::algo;
use crate::core::graph::{CommitGraph, Resolved};
use crate::core::repo::Repository;
use crate::core::types::{CommitId, TRUNK};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// What a fetch should bring over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSpec {
    /// Every origin branch into its `o/` mirror.
    All,
    /// One origin branch into its `o/` mirror.
    Branch(String),
    /// An origin ref into a plain local branch, created if needed.
    Refspec { source: String, destination: String },
    /// `:dst`, which only creates `dst` at HEAD.
    CreateAtHead(String),
}

/// Fetch tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the check that each destination is upstream of its source.
    pub tolerate_no_ff: bool,
}

/// What a fetch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Commits copied from origin, in creation order.
    pub created: Vec<CommitId>,
    /// Local branches created along the way.
    pub created_branches: Vec<String>,
    /// Destinations that moved.
    pub moved: Vec<String>,
}

impl FetchReport {
    /// Whether the fetch changed nothing.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.created_branches.is_empty() && self.moved.is_empty()
    }
}

/// What a push should send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSpec {
    /// Local ref to push. Empty deletes `destination` on origin.
    pub source: String,
    /// Origin branch name.
    pub destination: String,
    pub force: bool,
}

/// What a push did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Commits copied to origin, in creation order.
    pub created: Vec<CommitId>,
    /// Whether the origin branch had to be created.
    pub created_branch: bool,
    /// Tracking link made for a newly created branch.
    pub tracking: Option<TrackingLink>,
    /// Origin branch removed by a delete push.
    pub deleted: Option<String>,
    /// Origin commits pruned after a delete push.
    pub pruned: Vec<CommitId>,
    /// Nothing needed to change.
    pub up_to_date: bool,
}

struct FetchPair {
    source: String,
    source_commit: CommitId,
    destination: String,
    /// Where to create the destination when it does not exist yet.
    create_at: Option<CommitId>,
}

impl FetchPair {
    fn destination_commit(&self, local: &CommitGraph) -> Result<CommitId, SyncError> {
        match self.create_at {
            Some(at) => Ok(at),
            None => Ok(local.commit_from_ref(&self.destination)?),
        }
    }
}

/// Commits reachable from `start` in `source` that `destination` lacks,
/// ordered parents first.
fn missing_commits(
    source: &CommitGraph,
    destination: &CommitGraph,
    stop: &HashSet<CommitId>,
    start: CommitId,
) -> Result<Vec<CommitId>, SyncError> {
    let pending: Vec<CommitId> = algo::diff_from_set(source, stop, start)
        .into_iter()
        .filter(|id| !destination.contains_commit(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let satisfied: HashSet<CommitId> = destination.commits().map(|c| c.id).collect();
    Ok(algo::order_for_replay(source, pending, satisfied)?)
}

fn copy_commits(
    from: &CommitGraph,
    to: &mut CommitGraph,
    ids: &[CommitId],
) -> Result<(), SyncError> {
    for id in ids {
        let commit = from
            .commit(id)
            .ok_or_else(|| SyncError::NoSharedHistory(*id))?;
        to.create_commit(*id, commit.parents.clone(), commit.meta.clone())?;
    }
    Ok(())
}

fn plan_mirror(
    origin: &CommitGraph,
    local: &CommitGraph,
    branch: &str,
) -> Result<FetchPair, SyncError> {
    let source_commit = origin
        .branch(branch)
        .filter(|b| !b.is_remote())
        .map(|b| b.target)
        .ok_or_else(|| SyncError::NotABranch(branch.to_string()))?;
    let destination = remote_name(branch);
    let create_at = if local.has_ref(&destination) {
        None
    } else {
        Some(shared_ancestor(origin, local, source_commit)?)
    };
    Ok(FetchPair {
        source: branch.to_string(),
        source_commit,
        destination,
        create_at,
    })
}

/// Download commits from origin.
///
/// # Errors
///
/// - [`SyncError::NoOrigin`] without an origin
/// - [`SyncError::CheckedOut`] when a refspec destination is checked out
/// - [`SyncError::NonFastForward`] when a destination is not upstream of
///   its source and `tolerate_no_ff` is off
pub fn fetch(
    repo: &mut Repository,
    spec: &FetchSpec,
    options: FetchOptions,
) -> Result<FetchReport, SyncError> {
    let origin = origin_of(repo)?;
    let local = &repo.local;

    let mut extra_branches: Vec<(String, CommitId)> = Vec::new();
    let pairs: Vec<FetchPair> = match spec {
        FetchSpec::CreateAtHead(destination) => {
            let head = repo.local.head_commit()?;
            repo.local.create_branch(destination, head)?;
            return Ok(FetchReport {
                created_branches: vec![destination.clone()],
                ..FetchReport::default()
            });
        }
        FetchSpec::All => origin
            .branches()
            .filter(|b| !b.is_remote())
            .map(|b| plan_mirror(origin, local, &b.name))
            .collect::<Result<_, _>>()?,
        FetchSpec::Branch(source) => vec![plan_mirror(origin, local, source)?],
        FetchSpec::Refspec {
            source,
            destination,
        } => {
            let source_commit = origin.commit_from_ref(source)?;
            if local.head_branch() == Some(destination.as_str()) {
                return Err(SyncError::CheckedOut(destination.clone()));
            }
            if matches!(origin.resolve_ref(source)?, Resolved::Branch(_)) {
                let mirror = plan_mirror(origin, local, source)?;
                if let Some(at) = mirror.create_at {
                    extra_branches.push((mirror.destination, at));
                }
            }
            let create_at = if local.has_ref(destination) {
                None
            } else {
                Some(shared_ancestor(local, origin, local.head_commit()?)?)
            };
            vec![FetchPair {
                source: source.clone(),
                source_commit,
                destination: destination.clone(),
                create_at,
            }]
        }
    };

    let mut wanted = BTreeSet::new();
    for pair in &pairs {
        let at = pair.destination_commit(local)?;
        if !options.tolerate_no_ff
            && !algo::upstream_set(origin, pair.source_commit).contains(&at)
        {
            return Err(SyncError::NonFastForward {
                branch: pair.destination.clone(),
            });
        }
        let stop = algo::upstream_set(local, at);
        wanted.extend(missing_commits(origin, local, &stop, pair.source_commit)?);
    }
    let satisfied: HashSet<CommitId> = local.commits().map(|c| c.id).collect();
    let order = algo::order_for_replay(origin, wanted.into_iter().collect(), satisfied)?;

    let mut report = FetchReport {
        created: order,
        ..FetchReport::default()
    };
    let origin = repo.origin.as_ref().ok_or(SyncError::NoOrigin)?;
    copy_commits(origin, &mut repo.local, &report.created)?;

    for (name, at) in extra_branches {
        repo.local.create_branch(&name, at)?;
        report.created_branches.push(name);
    }
    for pair in pairs {
        debug!(source = %pair.source, destination = %pair.destination, "fetch pair");
        if let Some(at) = pair.create_at {
            repo.local.create_branch(&pair.destination, at)?;
            report.created_branches.push(pair.destination.clone());
        }
        if repo.local.commit_from_ref(&pair.destination)? != pair.source_commit {
            repo.local.move_branch(&pair.destination, pair.source_commit)?;
            report.moved.push(pair.destination);
        }
    }
    debug!(
        created = ?report.created,
        moved = ?report.moved,
        branches = ?report.created_branches,
        "fetch"
    );
    Ok(report)
}

/// Upload commits to origin.
///
/// # Errors
///
/// - [`SyncError::NoOrigin`] without an origin
/// - [`SyncError::TagPush`] when the source is a tag
/// - [`SyncError::NonFastForward`] when the origin branch is not upstream
///   of the source and `force` is off
/// - [`SyncError::ProtectedBranch`] / [`SyncError::DeleteMissing`] for bad
///   delete pushes
pub fn push(repo: &mut Repository, spec: &PushSpec) -> Result<PushReport, SyncError> {
    let origin = origin_of(repo)?;
    if spec.source.is_empty() {
        return delete_remote_branch(repo, &spec.destination);
    }

    let local = &repo.local;
    let resolved = local.resolve_ref(&spec.source)?;
    if let Resolved::Tag(name) = &resolved {
        return Err(SyncError::TagPush(name.clone()));
    }
    let source_commit = local.commit_of(&resolved)?;
    let remote = remote_name(&spec.destination);

    let existing = origin
        .branch(&spec.destination)
        .filter(|b| !b.is_remote())
        .map(|b| b.target);
    let origin_target = match existing {
        Some(target) => target,
        None => shared_ancestor(local, origin, source_commit)?,
    };

    if !spec.force && !algo::upstream_set(local, source_commit).contains(&origin_target) {
        return Err(SyncError::NonFastForward {
            branch: spec.destination.clone(),
        });
    }

    let stop = algo::upstream_set(origin, origin_target);
    let created = missing_commits(local, origin, &stop, source_commit)?;
    if existing.is_some() && created.is_empty() && (!spec.force || origin_target == source_commit)
    {
        return Ok(PushReport {
            up_to_date: true,
            ..PushReport::default()
        });
    }

    let mut report = PushReport {
        created,
        ..PushReport::default()
    };

    if existing.is_none() {
        report.created_branch = true;
        if repo.local.has_ref(&remote) {
            repo.local.move_branch(&remote, source_commit)?;
        } else {
            repo.local.create_branch(&remote, source_commit)?;
        }
        if repo.local.branch(&spec.destination).is_some() {
            repo.local
                .set_tracking(&spec.destination, Some(remote.clone()))?;
            report.tracking = Some(TrackingLink {
                local: spec.destination.clone(),
                remote: remote.clone(),
            });
        }
    }

    let origin = repo.origin.as_mut().ok_or(SyncError::NoOrigin)?;
    copy_commits(&repo.local, origin, &report.created)?;
    if existing.is_none() {
        origin.create_branch(&spec.destination, origin_target)?;
    }
    origin.move_branch(&spec.destination, source_commit)?;

    if repo.local.has_ref(&remote) {
        repo.local.move_branch(&remote, source_commit)?;
    } else {
        repo.local.create_branch(&remote, source_commit)?;
    }
    debug!(
        destination = %spec.destination,
        created = ?report.created,
        force = spec.force,
        "push"
    );
    Ok(report)
}

fn delete_remote_branch(repo: &mut Repository, destination: &str) -> Result<PushReport, SyncError> {
    if destination == TRUNK {
        return Err(SyncError::ProtectedBranch(destination.to_string()));
    }
    let origin = repo.origin.as_mut().ok_or(SyncError::NoOrigin)?;
    if origin.branch(destination).is_none() {
        return Err(SyncError::DeleteMissing(destination.to_string()));
    }
    origin.delete_branch(destination)?;
    let pruned = origin.prune();

    let remote = remote_name(destination);
    if repo.local.branch(&remote).is_some() {
        repo.local.delete_branch(&remote)?;
    }
    debug!(destination, pruned = ?pruned, "push delete");
    Ok(PushReport {
        deleted: Some(destination.to_string()),
        pruned,
        ..PushReport::default()
    })
}

/// The origin branch a local branch pushes to and pulls from.
pub fn tracked_origin_branch(local: &CommitGraph, branch: &str) -> Result<String, SyncError> {
    let entry = local
        .branch(branch)
        .ok_or_else(|| SyncError::NotTracking(branch.to_string()))?;
    entry
        .remote_tracking
        .as_deref()
        .and_then(origin_name)
        .map(str::to_string)
        .ok_or_else(|| SyncError::NotTracking(branch.to_string()))
}
