//! engine::rebase
//!
//! Replaying commits onto a new base.
//!
//! # Flow
//!
//! A plain rebase collects the commits reachable from the branch but not
//! from the target, drops merges and commits whose base id the target
//! already contains, and copies the rest oldest first. Every copy gets the
//! next free rewrite id of its original, so `C3` becomes `C3'`.
//!
//! An interactive rebase runs in two phases. [`Session::plan_interactive`]
//! computes a [`RebasePlan`] without touching the graph; the caller picks
//! an order and hands it to [`Session::apply_plan`].

use super::error::CommandError;
use super::ops::Session;
use crate::core::algo;
use crate::core::graph::{CommitGraph, Resolved};
use crate::core::types::CommitId;
use crate::ui::messages::Notice;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// How a rebase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseResult {
    UpToDate,
    FastForward,
    NothingToRebase,
    Rebased(CommitId),
}

/// The first phase of an interactive rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebasePlan {
    /// Where the chosen commits will be replayed.
    pub target: String,
    /// The ref that moves to the new tip afterwards.
    pub branch: String,
    /// Single-parent commits available for replay, oldest first.
    pub candidates: Vec<CommitId>,
    /// A suggested ordering, when the caller asked for one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<Vec<CommitId>>,
    /// Display hint: show every commit above the target, not just candidates.
    pub above_all: bool,
}

const NOT_IN_PLAN: &str = "Hey those commits don't exist in the set!";

/// Parse a comma-separated list of ids that must all be candidates.
pub(crate) fn parse_ordering(text: &str, candidates: &[CommitId]) -> Result<Vec<CommitId>, CommandError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<CommitId>()
                .ok()
                .filter(|id| candidates.contains(id))
                .ok_or_else(|| CommandError::validation(NOT_IN_PLAN))
        })
        .collect()
}

/// Commits worth replaying, oldest first.
///
/// Merges are dropped unless `preserve` is set. So is anything whose base
/// id `applied` already contains, and repeats.
fn filter_replayable(
    graph: &CommitGraph,
    oldest_first: Vec<CommitId>,
    applied: &HashSet<CommitId>,
    preserve: bool,
) -> Vec<CommitId> {
    let applied_bases: HashSet<CommitId> = applied.iter().map(CommitId::base).collect();
    let mut seen = HashSet::new();
    oldest_first
        .into_iter()
        .filter(|id| preserve || graph.parents_of(id).len() == 1)
        .filter(|id| !applied_bases.contains(&id.base()))
        .filter(|id| seen.insert(*id))
        .collect()
}

impl Session<'_> {
    /// Replay what `current` has beyond `target` onto `target`.
    pub fn rebase(
        &mut self,
        target: &str,
        current: &str,
        preserve: bool,
    ) -> Result<RebaseResult, CommandError> {
        let graph = self.local();
        let target_commit = graph.commit_from_ref(target)?;
        let current_ref = graph.resolve_ref(current)?;
        let current_commit = graph.commit_of(&current_ref)?;

        if algo::is_upstream_of(graph, target_commit, current_commit) {
            self.noop(Notice::UpToDate);
            self.checkout_resolved(&current_ref)?;
            return Ok(RebaseResult::UpToDate);
        }
        if algo::is_upstream_of(graph, current_commit, target_commit) {
            let branch = current_ref.name();
            self.finish(&current_ref, target_commit)?;
            let text = self.render(&Notice::FastForward { branch });
            self.say(text);
            return Ok(RebaseResult::FastForward);
        }

        let stop = algo::upstream_set(graph, target_commit);
        let mut rough = algo::diff_from_set(graph, &stop, current_commit);
        rough.reverse();
        let replay = filter_replayable(graph, rough, &stop, preserve);
        if replay.is_empty() {
            self.noop(Notice::NothingToRebase);
            return Ok(RebaseResult::NothingToRebase);
        }

        debug!(target, current, commits = ?replay, "rebasing");
        let tip = self.replay_onto(target_commit, &replay, preserve)?;
        self.finish(&current_ref, tip)?;
        Ok(RebaseResult::Rebased(tip))
    }

    /// Copy `commits` in order, each on top of the previous copy.
    ///
    /// With `preserve`, every copy after the first keeps its original
    /// parents, each swapped for its newest rewrite.
    fn replay_onto(
        &mut self,
        base: CommitId,
        commits: &[CommitId],
        preserve: bool,
    ) -> Result<CommitId, CommandError> {
        let mut base = base;
        for (index, old) in commits.iter().enumerate() {
            let parents = if preserve && index > 0 {
                self.local()
                    .parents_of(old)
                    .iter()
                    .map(|p| self.local().most_recent_rewrite(*p))
                    .collect()
            } else {
                vec![base]
            };
            let id = self.repo.rewritten_id(*old)?;
            let meta = self.copied_meta(*old);
            self.repo.create_commit(parents, Some(id), meta)?;
            base = id;
        }
        Ok(base)
    }

    /// Land `location` on `tip` and check it out. A bare commit detaches.
    fn finish(&mut self, location: &Resolved, tip: CommitId) -> Result<(), CommandError> {
        match location {
            Resolved::Commit(_) => self.checkout_resolved(&Resolved::Commit(tip)),
            other => {
                self.repo.local.set_target_location(other, tip)?;
                self.checkout_resolved(other)
            }
        }
    }

    /// First phase of an interactive rebase. Reads only.
    pub fn plan_interactive(
        &self,
        target: &str,
        branch: &str,
        suggested: Option<&str>,
        above_all: bool,
    ) -> Result<RebasePlan, CommandError> {
        let graph = self.local();
        let target_commit = graph.commit_from_ref(target)?;
        let current_commit = graph.commit_from_ref(branch)?;

        let stop = algo::upstream_set(graph, target_commit);
        let mut candidates: Vec<CommitId> = algo::diff_from_set(graph, &stop, current_commit)
            .into_iter()
            .filter(|id| graph.parents_of(id).len() == 1)
            .collect();
        candidates.reverse();

        let suggested = suggested
            .map(|text| parse_ordering(text, &candidates))
            .transpose()?;
        Ok(RebasePlan {
            target: target.to_string(),
            branch: branch.to_string(),
            candidates,
            suggested,
            above_all,
        })
    }

    /// Second phase: replay `order` onto the plan's target.
    ///
    /// An empty order changes nothing.
    pub fn apply_plan(&mut self, plan: &RebasePlan, order: &[CommitId]) -> Result<(), CommandError> {
        if let Some(stray) = order.iter().find(|id| !plan.candidates.contains(id)) {
            debug!(commit = %stray, "ordering names a commit outside the plan");
            return Err(CommandError::validation(NOT_IN_PLAN));
        }
        let graph = self.local();
        let replay = filter_replayable(graph, order.to_vec(), &HashSet::new(), false);
        if replay.is_empty() {
            self.noop(Notice::NothingToDo);
            return Ok(());
        }
        let target_commit = graph.commit_from_ref(&plan.target)?;
        let branch = graph.resolve_ref(&plan.branch)?;
        let tip = self.replay_onto(target_commit, &replay, false)?;
        self.finish(&branch, tip)
    }
}
