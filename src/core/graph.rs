//! core::graph
//!
//! Commit graph representation and ref resolution.
//!
//! # Architecture
//!
//! The commit graph is an arena:
//! - Commits are stored by id, each holding its ordered parent ids
//! - Children are a derived index, rebuilt incrementally on every insert
//! - Branches, tags and HEAD live next to the commits and all names share
//!   one flat ref table, so no branch can shadow a commit id or a tag
//!
//! # Invariants
//!
//! - Exactly one commit has no parents (the root)
//! - Every parent id names a commit in the same graph
//! - Every ref name is unique across commits, branches, tags and HEAD
//! - Branch and tag targets always name an existing commit
//!
//! Every mutation appends a [`Mutation`] to the graph's journal. Callers
//! drain it with [`CommitGraph::take_journal`] to learn what changed.

use super::algo;
use super::types::{alias_trunk, is_remote_name, CommitId, HEAD, TRUNK};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Errors from graph mutation and ref resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("the ref {0} does not exist or is unknown")]
    RefNotFound(String),

    #[error("cannot resolve {spec}: {reason}")]
    BadRelativeRef { spec: String, reason: String },

    #[error("the ref {0} already exists")]
    DuplicateRef(String),

    #[error("commit {commit} names unknown parent {parent}")]
    MissingParent { commit: CommitId, parent: CommitId },

    #[error("commit {0} would be a second root")]
    SecondRoot(CommitId),

    #[error("{0} is not a branch")]
    NotABranch(String),

    #[error("{cousin} is upstream of {ancestor}; no common ancestor search needed")]
    UnorderedAncestor { ancestor: CommitId, cousin: CommitId },

    #[error("cannot order {0} commits for replay: their parents are never satisfied")]
    ReplayStalled(usize),
}

/// Which kind of entity a ref name points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Commit,
    Branch,
    Tag,
    Head,
}

/// A resolved ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Commit(CommitId),
    Branch(String),
    Tag(String),
    Head,
}

impl Resolved {
    /// The display name of the resolved ref.
    pub fn name(&self) -> String {
        match self {
            Resolved::Commit(id) => id.to_string(),
            Resolved::Branch(name) | Resolved::Tag(name) => name.clone(),
            Resolved::Head => HEAD.to_string(),
        }
    }
}

/// Commit metadata carried for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub message: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl CommitMeta {
    /// Metadata stamped with the current time.
    pub fn now(message: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            author: author.into(),
            created_at: Utc::now(),
        }
    }
}

/// A commit node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: CommitId,
    /// Ordered parents; the first is the main line.
    pub parents: Vec<CommitId>,
    pub meta: CommitMeta,
}

impl Commit {
    /// Whether this is the root commit.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Whether this commit joins two or more lines.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A branch pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub target: CommitId,
    /// Name of the remote-tracking branch this branch follows.
    pub remote_tracking: Option<String>,
}

impl Branch {
    /// Whether this branch lives in the remote-tracking namespace.
    pub fn is_remote(&self) -> bool {
        is_remote_name(&self.name)
    }
}

/// A tag pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub target: CommitId,
}

/// Where HEAD points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadTarget {
    /// Attached to a branch.
    Branch(String),
    /// Detached at a commit.
    Commit(CommitId),
}

impl fmt::Display for HeadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadTarget::Branch(name) => f.write_str(name),
            HeadTarget::Commit(id) => write!(f, "{id}"),
        }
    }
}

/// The HEAD ref plus the target it held before the last move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub target: HeadTarget,
    pub previous: Option<HeadTarget>,
}

/// One recorded change to a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    CommitCreated { id: CommitId, parents: Vec<CommitId> },
    CommitPruned { id: CommitId },
    ParentsRewritten { id: CommitId, parents: Vec<CommitId> },
    RefCreated { name: String, target: String },
    RefMoved { name: String, from: String, to: String },
    RefDeleted { name: String },
    TrackingChanged { branch: String, remote: Option<String> },
}

/// The commit DAG plus its refs.
#[derive(Debug, Clone)]
pub struct CommitGraph {
    commits: BTreeMap<CommitId, Commit>,
    children: HashMap<CommitId, BTreeSet<CommitId>>,
    branches: BTreeMap<String, Branch>,
    tags: BTreeMap<String, Tag>,
    head: Head,
    refs: HashMap<String, RefKind>,
    is_origin: bool,
    journal: Vec<Mutation>,
}

impl CommitGraph {
    /// Create an empty graph with HEAD attached to the trunk name.
    ///
    /// The graph is not usable until a root commit and the trunk branch
    /// exist; see [`crate::tree::serialize`] for building complete graphs.
    pub fn new(is_origin: bool) -> Self {
        let mut refs = HashMap::new();
        refs.insert(HEAD.to_string(), RefKind::Head);
        Self {
            commits: BTreeMap::new(),
            children: HashMap::new(),
            branches: BTreeMap::new(),
            tags: BTreeMap::new(),
            head: Head {
                target: HeadTarget::Branch(TRUNK.to_string()),
                previous: None,
            },
            refs,
            is_origin,
            journal: Vec::new(),
        }
    }

    /// Whether this graph is the origin half of a pair.
    pub fn is_origin(&self) -> bool {
        self.is_origin
    }

    // ---- lookups -------------------------------------------------------

    /// Get a commit by id.
    pub fn commit(&self, id: &CommitId) -> Option<&Commit> {
        self.commits.get(id)
    }

    /// Whether a commit with this id exists.
    pub fn contains_commit(&self, id: &CommitId) -> bool {
        self.commits.contains_key(id)
    }

    /// All commits in id order.
    pub fn commits(&self) -> impl Iterator<Item = &Commit> {
        self.commits.values()
    }

    /// Children of a commit, in id order.
    pub fn children_of(&self, id: &CommitId) -> impl Iterator<Item = &CommitId> {
        self.children.get(id).into_iter().flatten()
    }

    /// Parents of a commit, empty when the commit is unknown.
    pub fn parents_of(&self, id: &CommitId) -> &[CommitId] {
        self.commits
            .get(id)
            .map(|c| c.parents.as_slice())
            .unwrap_or(&[])
    }

    /// Get a branch by name.
    pub fn branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// All branches in name order.
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values()
    }

    /// Get a tag by name.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// All tags in name order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// The HEAD ref.
    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Whether any entity already uses this name.
    pub fn has_ref(&self, name: &str) -> bool {
        self.refs.contains_key(name)
    }

    /// The kind of entity a name points at.
    pub fn ref_kind(&self, name: &str) -> Option<RefKind> {
        self.refs.get(name).copied()
    }

    /// Number of entries in the flat ref table.
    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    /// The branch HEAD is attached to, if any.
    pub fn head_branch(&self) -> Option<&str> {
        match &self.head.target {
            HeadTarget::Branch(name) => Some(name),
            HeadTarget::Commit(_) => None,
        }
    }

    /// Whether HEAD points straight at a commit.
    pub fn is_detached(&self) -> bool {
        matches!(self.head.target, HeadTarget::Commit(_))
    }

    /// The commit HEAD ultimately points at.
    pub fn head_commit(&self) -> Result<CommitId, GraphError> {
        self.commit_of(&Resolved::Head)
    }

    // ---- resolution ----------------------------------------------------

    fn lookup(&self, name: &str) -> Option<Resolved> {
        match self.refs.get(name)? {
            RefKind::Commit => name.parse().ok().map(Resolved::Commit),
            RefKind::Branch => Some(Resolved::Branch(name.to_string())),
            RefKind::Tag => Some(Resolved::Tag(name.to_string())),
            RefKind::Head => Some(Resolved::Head),
        }
    }

    fn lookup_loose(&self, name: &str) -> Option<Resolved> {
        if let Some(found) = self.lookup(name) {
            return Some(found);
        }
        let rest = name.strip_prefix('c')?;
        if CommitId::looks_like_id(name) {
            return self.lookup(&format!("C{rest}"));
        }
        None
    }

    /// Resolve a ref spec.
    ///
    /// Accepts a literal ref name, a lowercase commit id (`c3`), or a base
    /// ref followed by `^n` and `~n` modifiers. `main` is read as `master`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::RefNotFound`] when no base ref matches
    /// - [`GraphError::BadRelativeRef`] when a modifier walks off the graph
    ///
    /// # Example
    ///
    /// ```
    /// use gitsim::tree::serialize::{build_graph, default_tree};
    /// use gitsim::core::graph::Resolved;
    ///
    /// let graph = build_graph(&default_tree(), false).unwrap();
    /// assert_eq!(graph.resolve_ref("main").unwrap(), Resolved::Branch("master".into()));
    /// assert_eq!(graph.commit_from_ref("HEAD~1").unwrap().to_string(), "C0");
    /// assert!(graph.resolve_ref("HEAD~2").is_err());
    /// ```
    pub fn resolve_ref(&self, spec: &str) -> Result<Resolved, GraphError> {
        let spec = alias_trunk(spec.trim());
        if let Some(found) = self.lookup_loose(&spec) {
            return Ok(found);
        }

        // Prefer the longest base so ids like C2'^4 stay intact.
        let splits: Vec<usize> = spec
            .char_indices()
            .filter(|(_, c)| *c == '^' || *c == '~')
            .map(|(i, _)| i)
            .collect();
        for &split in splits.iter().rev() {
            let (base, chain) = spec.split_at(split);
            let Some(modifiers) = parse_modifiers(chain) else {
                continue;
            };
            let Some(resolved) = self.lookup_loose(base) else {
                continue;
            };
            let start = self.commit_of(&resolved)?;
            return self.walk_modifiers(&spec, start, &modifiers);
        }

        Err(GraphError::RefNotFound(spec))
    }

    fn walk_modifiers(
        &self,
        spec: &str,
        start: CommitId,
        modifiers: &[(char, Option<usize>)],
    ) -> Result<Resolved, GraphError> {
        let mut current = start;
        for &(op, count) in modifiers {
            let parents = self.parents_of(&current);
            match op {
                '^' => {
                    let nth = count.unwrap_or(1);
                    if nth == 0 {
                        continue;
                    }
                    current = *parents.get(nth - 1).ok_or_else(|| GraphError::BadRelativeRef {
                        spec: spec.to_string(),
                        reason: format!("commit {current} has no parent number {nth}"),
                    })?;
                }
                _ => {
                    for _ in 0..count.unwrap_or(1) {
                        current = *self.parents_of(&current).first().ok_or_else(|| {
                            GraphError::BadRelativeRef {
                                spec: spec.to_string(),
                                reason: format!("commit {current} has no parent"),
                            }
                        })?;
                    }
                }
            }
        }
        Ok(Resolved::Commit(current))
    }

    /// Dereference a resolved ref down to its commit.
    pub fn commit_of(&self, resolved: &Resolved) -> Result<CommitId, GraphError> {
        match resolved {
            Resolved::Commit(id) => Ok(*id),
            Resolved::Branch(name) => self
                .branches
                .get(name)
                .map(|b| b.target)
                .ok_or_else(|| GraphError::RefNotFound(name.clone())),
            Resolved::Tag(name) => self
                .tags
                .get(name)
                .map(|t| t.target)
                .ok_or_else(|| GraphError::RefNotFound(name.clone())),
            Resolved::Head => match &self.head.target {
                HeadTarget::Commit(id) => Ok(*id),
                HeadTarget::Branch(name) => self.commit_of(&Resolved::Branch(name.clone())),
            },
        }
    }

    /// Resolve a spec and dereference it to a commit.
    pub fn commit_from_ref(&self, spec: &str) -> Result<CommitId, GraphError> {
        let resolved = self.resolve_ref(spec)?;
        self.commit_of(&resolved)
    }

    /// Follow rewrites of `id` to the newest one present in this graph.
    ///
    /// `C3` with `C3'` and `C3''` present yields `C3''`.
    pub fn most_recent_rewrite(&self, id: CommitId) -> CommitId {
        let mut current = id;
        while let Ok(next) = current.bumped() {
            if !self.contains_commit(&next) {
                break;
            }
            current = next;
        }
        current
    }

    // ---- mutation ------------------------------------------------------

    /// Insert a commit with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Fails when the id is taken, a parent is missing, or the commit would
    /// add a second root.
    pub fn create_commit(
        &mut self,
        id: CommitId,
        parents: Vec<CommitId>,
        meta: CommitMeta,
    ) -> Result<CommitId, GraphError> {
        let key = id.to_string();
        if self.refs.contains_key(&key) {
            return Err(GraphError::DuplicateRef(key));
        }
        if parents.is_empty() && !self.commits.is_empty() {
            return Err(GraphError::SecondRoot(id));
        }
        if let Some(parent) = parents.iter().find(|p| !self.commits.contains_key(p)) {
            return Err(GraphError::MissingParent {
                commit: id,
                parent: *parent,
            });
        }

        for parent in &parents {
            self.children.entry(*parent).or_default().insert(id);
        }
        trace!(commit = %id, parents = ?parents, origin = self.is_origin, "create commit");
        self.journal.push(Mutation::CommitCreated {
            id,
            parents: parents.clone(),
        });
        self.commits.insert(id, Commit { id, parents, meta });
        self.refs.insert(key, RefKind::Commit);
        Ok(id)
    }

    /// Create a branch at a commit.
    pub fn create_branch(&mut self, name: &str, target: CommitId) -> Result<(), GraphError> {
        self.claim_name(name, target, RefKind::Branch)?;
        self.branches.insert(
            name.to_string(),
            Branch {
                name: name.to_string(),
                target,
                remote_tracking: None,
            },
        );
        Ok(())
    }

    /// Create a tag at a commit.
    pub fn create_tag(&mut self, name: &str, target: CommitId) -> Result<(), GraphError> {
        self.claim_name(name, target, RefKind::Tag)?;
        self.tags.insert(
            name.to_string(),
            Tag {
                name: name.to_string(),
                target,
            },
        );
        Ok(())
    }

    fn claim_name(&mut self, name: &str, target: CommitId, kind: RefKind) -> Result<(), GraphError> {
        if self.refs.contains_key(name) {
            return Err(GraphError::DuplicateRef(name.to_string()));
        }
        if !self.contains_commit(&target) {
            return Err(GraphError::RefNotFound(target.to_string()));
        }
        self.refs.insert(name.to_string(), kind);
        self.journal.push(Mutation::RefCreated {
            name: name.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    /// Point a branch at another commit.
    pub fn move_branch(&mut self, name: &str, target: CommitId) -> Result<(), GraphError> {
        if !self.contains_commit(&target) {
            return Err(GraphError::RefNotFound(target.to_string()));
        }
        let branch = self
            .branches
            .get_mut(name)
            .ok_or_else(|| GraphError::NotABranch(name.to_string()))?;
        if branch.target != target {
            self.journal.push(Mutation::RefMoved {
                name: name.to_string(),
                from: branch.target.to_string(),
                to: target.to_string(),
            });
            branch.target = target;
        }
        Ok(())
    }

    fn move_tag(&mut self, name: &str, target: CommitId) -> Result<(), GraphError> {
        let tag = self
            .tags
            .get_mut(name)
            .ok_or_else(|| GraphError::RefNotFound(name.to_string()))?;
        if tag.target != target {
            self.journal.push(Mutation::RefMoved {
                name: name.to_string(),
                from: tag.target.to_string(),
                to: target.to_string(),
            });
            tag.target = target;
        }
        Ok(())
    }

    /// Point HEAD somewhere else, remembering the old target.
    pub fn set_head(&mut self, target: HeadTarget) -> Result<(), GraphError> {
        match &target {
            HeadTarget::Branch(name) if !self.branches.contains_key(name) => {
                return Err(GraphError::NotABranch(name.clone()))
            }
            HeadTarget::Commit(id) if !self.contains_commit(id) => {
                return Err(GraphError::RefNotFound(id.to_string()))
            }
            _ => {}
        }
        if self.head.target != target {
            self.journal.push(Mutation::RefMoved {
                name: HEAD.to_string(),
                from: self.head.target.to_string(),
                to: target.to_string(),
            });
            let old = std::mem::replace(&mut self.head.target, target);
            self.head.previous = Some(old);
        }
        Ok(())
    }

    /// Overwrite the remembered previous HEAD target.
    pub(crate) fn set_head_history(&mut self, previous: Option<HeadTarget>) {
        self.head.previous = previous;
    }

    /// Move whatever `location` stands for so it lands on `commit`.
    ///
    /// HEAD moves its branch when attached and itself when detached. A bare
    /// commit cannot move and is left alone.
    pub fn set_target_location(
        &mut self,
        location: &Resolved,
        commit: CommitId,
    ) -> Result<(), GraphError> {
        match location {
            Resolved::Commit(_) => Ok(()),
            Resolved::Branch(name) => self.move_branch(name, commit),
            Resolved::Tag(name) => self.move_tag(name, commit),
            Resolved::Head => match self.head.target.clone() {
                HeadTarget::Branch(name) => self.move_branch(&name, commit),
                HeadTarget::Commit(_) => self.set_head(HeadTarget::Commit(commit)),
            },
        }
    }

    /// Remove a branch.
    ///
    /// Tracking links to the branch are cleared. If HEAD was attached to it,
    /// HEAD falls back to the trunk.
    pub fn delete_branch(&mut self, name: &str) -> Result<(), GraphError> {
        if self.branches.remove(name).is_none() {
            return Err(GraphError::NotABranch(name.to_string()));
        }
        self.refs.remove(name);
        self.journal.push(Mutation::RefDeleted {
            name: name.to_string(),
        });

        let trackers: Vec<String> = self
            .branches
            .values()
            .filter(|b| b.remote_tracking.as_deref() == Some(name))
            .map(|b| b.name.clone())
            .collect();
        for tracker in trackers {
            self.set_tracking(&tracker, None)?;
        }

        if self.head.target == HeadTarget::Branch(name.to_string()) {
            self.head.target = HeadTarget::Branch(TRUNK.to_string());
            self.journal.push(Mutation::RefMoved {
                name: HEAD.to_string(),
                from: name.to_string(),
                to: TRUNK.to_string(),
            });
        }
        Ok(())
    }

    /// Remove a tag.
    pub fn delete_tag(&mut self, name: &str) -> Result<(), GraphError> {
        if self.tags.remove(name).is_none() {
            return Err(GraphError::RefNotFound(name.to_string()));
        }
        self.refs.remove(name);
        self.journal.push(Mutation::RefDeleted {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Set or clear the remote-tracking link of a branch.
    pub fn set_tracking(&mut self, branch: &str, remote: Option<String>) -> Result<(), GraphError> {
        let entry = self
            .branches
            .get_mut(branch)
            .ok_or_else(|| GraphError::NotABranch(branch.to_string()))?;
        if entry.remote_tracking != remote {
            entry.remote_tracking = remote.clone();
            self.journal.push(Mutation::TrackingChanged {
                branch: branch.to_string(),
                remote,
            });
        }
        Ok(())
    }

    /// Replace the parent list of an existing commit.
    ///
    /// Only the hg rebase repair pass uses this.
    pub fn rewrite_parents(
        &mut self,
        id: CommitId,
        parents: Vec<CommitId>,
    ) -> Result<(), GraphError> {
        if let Some(parent) = parents.iter().find(|p| !self.commits.contains_key(p)) {
            return Err(GraphError::MissingParent {
                commit: id,
                parent: *parent,
            });
        }
        let commit = self
            .commits
            .get_mut(&id)
            .ok_or_else(|| GraphError::RefNotFound(id.to_string()))?;
        for old in &commit.parents {
            if let Some(kids) = self.children.get_mut(old) {
                kids.remove(&id);
            }
        }
        for new in &parents {
            self.children.entry(*new).or_default().insert(id);
        }
        commit.parents = parents.clone();
        self.journal
            .push(Mutation::ParentsRewritten { id, parents });
        Ok(())
    }

    /// Remove every commit no branch, tag or HEAD can reach.
    ///
    /// Returns the pruned ids in ascending order.
    pub fn prune(&mut self) -> Vec<CommitId> {
        let mut keep: HashSet<CommitId> = HashSet::new();
        let mut tips: Vec<CommitId> = self.branches.values().map(|b| b.target).collect();
        tips.extend(self.tags.values().map(|t| t.target));
        if let Ok(head) = self.head_commit() {
            tips.push(head);
        }
        for tip in tips {
            if !keep.contains(&tip) {
                keep.extend(algo::upstream_set(self, tip));
            }
        }

        let doomed: Vec<CommitId> = self
            .commits
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &doomed {
            self.remove_commit(*id);
        }
        doomed
    }

    fn remove_commit(&mut self, id: CommitId) {
        if let Some(commit) = self.commits.remove(&id) {
            for parent in &commit.parents {
                if let Some(kids) = self.children.get_mut(parent) {
                    kids.remove(&id);
                }
            }
            self.children.remove(&id);
            self.refs.remove(&id.to_string());
            self.journal.push(Mutation::CommitPruned { id });
        }
    }

    /// Drain the recorded mutations.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }
}

/// Parse a `^n` / `~n` chain. `None` when the text is not a pure chain.
fn parse_modifiers(chain: &str) -> Option<Vec<(char, Option<usize>)>> {
    let mut out = Vec::new();
    let mut chars = chain.chars().peekable();
    while let Some(op) = chars.next() {
        if op != '^' && op != '~' {
            return None;
        }
        let mut digits = String::new();
        while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(c);
            chars.next();
        }
        let count = if digits.is_empty() {
            None
        } else {
            Some(digits.parse().ok()?)
        };
        out.push((op, count));
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
