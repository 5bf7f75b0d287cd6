//! engine::ops
//!
//! Graph operations behind the git dialect.
//!
//! A [`Session`] wraps the repository for the duration of one command and
//! collects what the command wants to report: its status, an optional
//! result text, and warnings. Operations validate and resolve every input
//! before the first mutation.

use super::command::Dialect;
use super::error::CommandError;
use super::{EngineConfig, Status};
use crate::core::algo;
use crate::core::graph::{CommitGraph, CommitMeta, GraphError, HeadTarget, Resolved};
use crate::core::range::RevisionRange;
use crate::core::repo::Repository;
use crate::core::types::{alias_trunk, is_remote_name, validate_branch_name, CommitId};
use crate::tree::serialize::DEFAULT_MESSAGE;
use crate::ui::messages::{Messages, Notice};
use std::collections::HashSet;

/// How a merge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    UpToDate,
    FastForward,
    Merged(CommitId),
}

/// Which branches a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchFilter {
    Local,
    Remote,
    All,
}

/// One command's view of the repository plus what it reports back.
pub(crate) struct Session<'a> {
    pub repo: &'a mut Repository,
    pub settings: &'a EngineConfig,
    pub messages: &'a dyn Messages,
    pub mode: Dialect,
    pub status: Status,
    pub message: Option<String>,
    pub warnings: Vec<String>,
    pub plan: Option<super::rebase::RebasePlan>,
}

impl<'a> Session<'a> {
    pub fn new(
        repo: &'a mut Repository,
        settings: &'a EngineConfig,
        messages: &'a dyn Messages,
        mode: Dialect,
    ) -> Self {
        Self {
            repo,
            settings,
            messages,
            mode,
            status: Status::Success,
            message: None,
            warnings: Vec::new(),
            plan: None,
        }
    }

    // ---- reporting -----------------------------------------------------

    pub fn render(&self, notice: &Notice) -> String {
        self.messages.render(notice)
    }

    pub fn warn(&mut self, notice: Notice) {
        let text = self.render(&notice);
        self.warnings.push(text);
    }

    /// Report a result text without changing the status.
    pub fn say(&mut self, text: impl Into<String>) {
        self.message = Some(text.into());
    }

    /// Mark the command as a no-op with an explanation.
    pub fn noop(&mut self, notice: Notice) {
        self.status = Status::NoOp;
        self.message = Some(self.render(&notice));
    }

    // ---- shared helpers ------------------------------------------------

    pub fn local(&self) -> &CommitGraph {
        &self.repo.local
    }

    pub fn meta(&self, message: Option<&str>) -> CommitMeta {
        CommitMeta::now(message.unwrap_or(DEFAULT_MESSAGE), &self.settings.author)
    }

    /// Validate a new branch or tag name, warning when it gets truncated.
    pub fn valid_name(&mut self, raw: &str) -> Result<String, CommandError> {
        let aliased = alias_trunk(raw.trim());
        let valid = validate_branch_name(&aliased, self.settings.max_branch_name_len)?;
        if let Some(from) = valid.truncated_from {
            self.warn(Notice::NameTruncated {
                from,
                to: valid.name.clone(),
            });
        }
        Ok(valid.name)
    }

    /// Existing refs are taken as they are; new names are validated.
    pub fn valid_name_if_needed(&mut self, raw: &str) -> Result<String, CommandError> {
        if self.local().has_ref(raw) {
            Ok(raw.to_string())
        } else {
            self.valid_name(raw)
        }
    }

    /// HEAD's branch when attached, its commit when detached.
    pub fn current_location(&self) -> Result<Resolved, CommandError> {
        Ok(match &self.local().head().target {
            HeadTarget::Branch(name) => Resolved::Branch(name.clone()),
            HeadTarget::Commit(id) => Resolved::Commit(*id),
        })
    }

    /// Name of the current location for messages.
    pub fn current_name(&self) -> String {
        self.local().head().target.to_string()
    }

    // ---- commit & checkout ---------------------------------------------

    /// Commit on top of HEAD, or replace HEAD when amending.
    pub fn commit(&mut self, amend: bool, message: Option<&str>) -> Result<CommitId, CommandError> {
        let (parent, id) = if amend {
            let head = self.local().head_commit()?;
            (
                self.local().commit_from_ref("HEAD~1")?,
                Some(self.repo.rewritten_id(head)?),
            )
        } else {
            (self.local().head_commit()?, None)
        };
        let meta = self.meta(message);
        let new = self.repo.create_commit(vec![parent], id, meta)?;
        if self.local().is_detached() && self.mode == Dialect::Git && self.settings.detached_warning
        {
            self.warn(Notice::DetachedCommit);
        }
        self.repo.local.set_target_location(&Resolved::Head, new)?;
        Ok(new)
    }

    /// Move HEAD. Local branches attach; everything else detaches.
    pub fn checkout(&mut self, spec: &str) -> Result<(), CommandError> {
        let resolved = self.local().resolve_ref(spec)?;
        self.checkout_resolved(&resolved)
    }

    pub fn checkout_resolved(&mut self, resolved: &Resolved) -> Result<(), CommandError> {
        let target = match resolved {
            Resolved::Head => return Ok(()),
            Resolved::Branch(name) if !is_remote_name(name) => HeadTarget::Branch(name.clone()),
            other => HeadTarget::Commit(self.local().commit_of(other)?),
        };
        self.repo.local.set_head(target)?;
        Ok(())
    }

    /// Return HEAD to where it was before its last move.
    pub fn checkout_previous(&mut self) -> Result<(), CommandError> {
        let previous = self
            .local()
            .head()
            .previous
            .clone()
            .ok_or_else(|| CommandError::state(self.render(&Notice::NothingToDo)))?;
        self.repo.local.set_head(previous)?;
        Ok(())
    }

    // ---- branches & tags -----------------------------------------------

    /// Create a branch. Starting from a remote branch also sets tracking.
    pub fn create_branch(&mut self, raw: &str, start: &str) -> Result<String, CommandError> {
        let start_ref = self.local().resolve_ref(start)?;
        let target = self.local().commit_of(&start_ref)?;
        let name = self.valid_name(raw)?;
        if self.local().has_ref(&name) {
            return Err(GraphError::DuplicateRef(name).into());
        }
        self.repo.local.create_branch(&name, target)?;
        if let Resolved::Branch(remote) = start_ref {
            if is_remote_name(&remote) {
                self.track(&name, &remote)?;
            }
        }
        Ok(name)
    }

    /// Point a branch at `start`, creating it first if needed.
    pub fn force_branch(&mut self, name: &str, start: &str) -> Result<(), CommandError> {
        if !self.local().has_ref(name) {
            self.create_branch(name, start)?;
        }
        match self.local().resolve_ref(name)? {
            Resolved::Branch(branch) if is_remote_name(&branch) => Err(CommandError::validation(
                format!("{branch} is a remote branch; it cannot be moved directly"),
            )),
            Resolved::Branch(branch) => {
                let target = self.local().commit_from_ref(start)?;
                self.repo.local.move_branch(&branch, target)?;
                Ok(())
            }
            _ => Err(GraphError::NotABranch(name.to_string()).into()),
        }
    }

    /// Delete a local branch other than the trunk or the checked-out one.
    pub fn delete_branch(&mut self, name: &str) -> Result<(), CommandError> {
        let resolved = self.local().resolve_ref(name)?;
        let Resolved::Branch(branch) = resolved else {
            return Err(CommandError::state(format!(
                "{name} is not a branch and cannot be deleted"
            )));
        };
        if branch == crate::core::types::TRUNK || self.local().head_branch() == Some(&branch) {
            return Err(CommandError::state(format!(
                "you cannot delete {branch} while it is the trunk or checked out"
            )));
        }
        if is_remote_name(&branch) {
            return Err(CommandError::state(format!(
                "{branch} is a remote branch and cannot be deleted locally"
            )));
        }
        self.repo.local.delete_branch(&branch)?;
        Ok(())
    }

    /// Make `local` track the remote-tracking branch `remote`.
    pub fn set_upstream(&mut self, remote: &str, local: &str) -> Result<(), CommandError> {
        match self.local().resolve_ref(remote)? {
            Resolved::Branch(name) if is_remote_name(&name) => {}
            _ => return Err(crate::remote::SyncError::NotARemote(remote.to_string()).into()),
        }
        let local = match self.local().resolve_ref(local)? {
            Resolved::Branch(name) => name,
            Resolved::Head => self
                .local()
                .head_branch()
                .map(str::to_string)
                .ok_or_else(|| GraphError::NotABranch(local.to_string()))?,
            _ => return Err(GraphError::NotABranch(local.to_string()).into()),
        };
        self.track(&local, &alias_trunk(remote))
    }

    fn track(&mut self, local: &str, remote: &str) -> Result<(), CommandError> {
        self.repo
            .local
            .set_tracking(local, Some(remote.to_string()))?;
        self.warn(Notice::TrackingSet {
            local: local.to_string(),
            remote: remote.to_string(),
        });
        Ok(())
    }

    fn format_branches<'b>(&self, names: impl Iterator<Item = &'b str>) -> String {
        let current = self.local().head_branch();
        names
            .map(|name| {
                if Some(name) == current {
                    format!("* {name}")
                } else {
                    name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text listing of branches; the checked-out one is starred.
    pub fn list_branches(&self, filter: BranchFilter) -> String {
        let names = self
            .local()
            .branches()
            .filter(|b| match filter {
                BranchFilter::Local => !b.is_remote(),
                BranchFilter::Remote => b.is_remote(),
                BranchFilter::All => true,
            })
            .map(|b| b.name.as_str());
        self.format_branches(names)
    }

    /// Text listing of branches whose history contains `spec`.
    pub fn branches_containing(&self, spec: &str) -> Result<String, CommandError> {
        let graph = self.local();
        let commit = graph.commit_from_ref(spec)?;
        let names = graph
            .branches()
            .filter(|b| algo::is_upstream_of(graph, commit, b.target))
            .map(|b| b.name.as_str());
        Ok(self.format_branches(names))
    }

    pub fn create_tag(&mut self, raw: &str, start: &str) -> Result<String, CommandError> {
        let target = self.local().commit_from_ref(start)?;
        let name = self.valid_name(raw)?;
        if self.local().has_ref(&name) {
            return Err(GraphError::DuplicateRef(name).into());
        }
        self.repo.local.create_tag(&name, target)?;
        Ok(name)
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<(), CommandError> {
        if self.local().tag(name).is_none() {
            return Err(CommandError::state(format!(
                "no tag named {name} found, nothing to remove"
            )));
        }
        self.repo.local.delete_tag(name)?;
        Ok(())
    }

    pub fn list_tags(&self) -> String {
        self.local()
            .tags()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ---- history-changing commands -------------------------------------

    /// Merge `source` into HEAD.
    pub fn merge(&mut self, source: &str, no_ff: bool) -> Result<MergeResult, CommandError> {
        let graph = self.local();
        let source_ref = graph.resolve_ref(source)?;
        let source_commit = graph.commit_of(&source_ref)?;
        let head = graph.head_commit()?;

        if algo::is_upstream_of(graph, source_commit, head) {
            self.noop(Notice::UpToDate);
            return Ok(MergeResult::UpToDate);
        }
        if !no_ff && algo::is_upstream_of(graph, head, source_commit) {
            let branch = self.current_name();
            self.repo
                .local
                .set_target_location(&Resolved::Head, source_commit)?;
            let text = self.render(&Notice::FastForward { branch });
            self.say(text);
            return Ok(MergeResult::FastForward);
        }

        let message = self.render(&Notice::MergeMessage {
            source: source_ref.name(),
            target: self.current_name(),
        });
        let meta = self.meta(Some(&message));
        let merged = self
            .repo
            .create_commit(vec![head, source_commit], None, meta)?;
        self.repo.local.set_target_location(&Resolved::Head, merged)?;
        Ok(MergeResult::Merged(merged))
    }

    /// Move HEAD's effective branch to `spec`.
    pub fn reset(&mut self, spec: &str) -> Result<(), CommandError> {
        if self.local().is_detached() {
            return Err(CommandError::state(
                "cannot reset in detached HEAD mode; check out a branch first",
            ));
        }
        let target = self.local().commit_from_ref(spec)?;
        self.repo.local.set_target_location(&Resolved::Head, target)?;
        Ok(())
    }

    /// Copy commits onto HEAD with rewritten ids.
    pub fn cherry_pick(&mut self, specs: &[String]) -> Result<Vec<CommitId>, CommandError> {
        let graph = self.local();
        let upstream = algo::upstream_set(graph, graph.head_commit()?);
        let mut picks = Vec::with_capacity(specs.len());
        for spec in specs {
            let commit = graph.commit_from_ref(spec)?;
            if upstream.contains(&commit) {
                return Err(CommandError::state(format!(
                    "the commit {commit} already exists in your changes set, aborting"
                )));
            }
            picks.push(commit);
        }

        let mut made = Vec::with_capacity(picks.len());
        for old in picks {
            let head = self.local().head_commit()?;
            let id = self.repo.rewritten_id(old)?;
            let meta = self.copied_meta(old);
            self.repo.create_commit(vec![head], Some(id), meta)?;
            self.repo.local.set_target_location(&Resolved::Head, id)?;
            made.push(id);
        }
        Ok(made)
    }

    /// Stack one reverting commit per target on HEAD.
    pub fn revert(&mut self, specs: &[String]) -> Result<Vec<CommitId>, CommandError> {
        let targets = specs
            .iter()
            .map(|s| self.local().commit_from_ref(s))
            .collect::<Result<Vec<_>, _>>()?;

        let mut base = self.local().head_commit()?;
        let mut made = Vec::with_capacity(targets.len());
        for old in targets {
            let original = self
                .local()
                .commit(&old)
                .map(|c| c.meta.message.clone())
                .unwrap_or_default();
            let message = self.render(&Notice::RevertMessage {
                commit: old,
                message: original,
            });
            let id = self.repo.rewritten_id(old)?;
            let meta = self.meta(Some(&message));
            self.repo.create_commit(vec![base], Some(id), meta)?;
            base = id;
            made.push(id);
        }
        self.repo.local.set_target_location(&Resolved::Head, base)?;
        Ok(made)
    }

    /// Metadata for a copy of `old`: same message, fresh author and time.
    pub fn copied_meta(&self, old: CommitId) -> CommitMeta {
        let message = self.local().commit(&old).map(|c| c.meta.message.clone());
        self.meta(message.as_deref())
    }

    // ---- read-only reports ---------------------------------------------

    /// `tag` when `spec` is tagged, else `tag_<distance>_g<id>`.
    pub fn describe(&self, spec: &str) -> Result<String, CommandError> {
        let graph = self.local();
        if graph.tags().next().is_none() {
            return Err(CommandError::state(
                "fatal: no tags found, cannot describe anything",
            ));
        }
        let start = graph.commit_from_ref(spec)?;
        match algo::nearest_tag(graph, start) {
            None => Err(CommandError::state("fatal: no tags found upstream")),
            Some((tag, 0)) => Ok(tag),
            Some((tag, distance)) => Ok(format!("{tag}_{distance}_g{start}")),
        }
    }

    fn log_entry(&self, id: &CommitId) -> String {
        match self.local().commit(id) {
            Some(commit) => format!(
                "Author: {}\nDate: {}\n\n{}\n\nCommit: {}\n",
                commit.meta.author,
                commit.meta.created_at.to_rfc2822(),
                commit.meta.message,
                commit.id
            ),
            None => String::new(),
        }
    }

    pub fn log(&self, specs: &[String]) -> Result<String, CommandError> {
        let ids = RevisionRange::parse(specs).resolve(self.local())?;
        Ok(ids
            .iter()
            .map(|id| self.log_entry(id))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn rev_list(&self, specs: &[String]) -> Result<String, CommandError> {
        let ids = RevisionRange::parse(specs).resolve(self.local())?;
        Ok(ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn show(&self, spec: &str) -> Result<String, CommandError> {
        let id = self.local().commit_from_ref(spec)?;
        Ok(format!(
            "{}\ndiff --git a/bigGameResults.html b/bigGameResults.html\n\
             --- bigGameResults.html\n\
             +++ bigGameResults.html\n\
             @@ 13,27 @@ Winner, Score\n\
             - Stanfurd, 14-7\n\
             + Cal, 21-14\n",
            self.log_entry(&id)
        ))
    }

    pub fn status(&self) -> String {
        let first = match self.local().head_branch() {
            Some(branch) => format!("On branch {branch}"),
            None => "Detached HEAD!".to_string(),
        };
        [
            first.as_str(),
            "Changes to be committed:",
            "",
            "\tmodified: cal/OskiCostume.stl",
            "",
            "Ready to commit! (as always in this demo)",
        ]
        .iter()
        .map(|line| format!("# {line}"))
        .collect::<Vec<_>>()
        .join("\n")
    }

    // ---- maintenance ---------------------------------------------------

    /// Move each named branch to the newest rewrite of its target.
    ///
    /// Returns whether any branch moved.
    pub fn update_branches_to_rewrites(&mut self, branches: &[String]) -> Result<bool, CommandError> {
        let mut moved = false;
        for name in branches {
            let Some(current) = self.local().branch(name).map(|b| b.target) else {
                continue;
            };
            let newest = self.local().most_recent_rewrite(current);
            if newest != current {
                self.repo.local.move_branch(name, newest)?;
                moved = true;
            }
        }
        Ok(moved)
    }

    /// Drop unreachable commits, warning when any went away.
    pub fn prune(&mut self) -> Vec<CommitId> {
        let pruned = self.repo.local.prune();
        if !pruned.is_empty() {
            self.warn(Notice::PrunedCommits {
                count: pruned.len(),
            });
        }
        pruned
    }

    /// Every branch whose history reaches into `set`.
    pub fn branches_reaching(&self, set: &HashSet<CommitId>) -> Vec<String> {
        let graph = self.local();
        graph
            .branches()
            .filter(|b| algo::upstream_set(graph, b.target).iter().any(|c| set.contains(c)))
            .map(|b| b.name.clone())
            .collect()
    }
}
