//! tree::serialize
//!
//! Canonical flat-map export and import.
//!
//! # Format
//!
//! ```json
//! {
//!   "branches": {"master": {"id": "master", "target": "C1", "remoteTrackingBranchID": null}},
//!   "commits": {
//!     "C0": {"id": "C0", "parents": [], "rootCommit": true},
//!     "C1": {"id": "C1", "parents": ["C0"]}
//!   },
//!   "tags": {},
//!   "HEAD": {"id": "HEAD", "target": "master"},
//!   "originTree": { "...": "same shape, present iff an origin exists" }
//! }
//! ```
//!
//! Export writes only stored fields; children are derived and never
//! serialized. Import creates every commit after its parents, so the graph
//! never holds a commit whose parents are missing.

use crate::core::config::DEFAULT_AUTHOR;
use crate::core::graph::{CommitGraph, CommitMeta, GraphError, HeadTarget};
use crate::core::repo::Repository;
use crate::core::types::{CommitId, TypeError, HEAD, TRUNK};
use crate::core::{algo, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

/// Message given to commits that do not carry one.
pub const DEFAULT_MESSAGE: &str = "Quick commit. Go Bears!";

/// Errors from tree import.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to parse tree JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("commit {0} names a parent missing from the tree")]
    MissingParent(String),

    #[error("commit {0} is part of a parent cycle")]
    Cycle(String),

    #[error("HEAD target {0} is neither a branch nor a commit")]
    BadHead(String),

    #[error("tree failed verification: {0}")]
    Invalid(String),
}

/// A serialized commit graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub branches: BTreeMap<String, TreeBranch>,
    pub commits: BTreeMap<String, TreeCommit>,
    #[serde(default)]
    pub tags: BTreeMap<String, TreeTag>,
    #[serde(rename = "HEAD")]
    pub head: TreeHead,
    #[serde(
        rename = "originTree",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_tree: Option<Box<TreeSnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeBranch {
    pub id: String,
    pub target: String,
    #[serde(
        rename = "remoteTrackingBranchID",
        alias = "remoteTrackingBranchId",
        default
    )]
    pub remote_tracking_branch_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeCommit {
    pub id: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(rename = "rootCommit", default, skip_serializing_if = "is_false")]
    pub root_commit: bool,
    #[serde(
        rename = "commitMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "createTime", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeTag {
    pub id: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeHead {
    pub id: String,
    pub target: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TreeSnapshot {
    /// Parse a tree from JSON text.
    pub fn from_json(text: &str) -> Result<Self, TreeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compact JSON, the form handed to persistence layers.
    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON for humans.
    pub fn to_json_pretty(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The starting tree: `C0 <- C1`, `master -> C1`, HEAD on master.
pub fn default_tree() -> TreeSnapshot {
    let commit = |id: &str, parents: &[&str]| TreeCommit {
        id: id.to_string(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
        root_commit: parents.is_empty(),
        commit_message: Some(DEFAULT_MESSAGE.to_string()),
        author: None,
        create_time: None,
    };
    TreeSnapshot {
        branches: BTreeMap::from([(
            TRUNK.to_string(),
            TreeBranch {
                id: TRUNK.to_string(),
                target: "C1".to_string(),
                remote_tracking_branch_id: None,
            },
        )]),
        commits: BTreeMap::from([
            ("C0".to_string(), commit("C0", &[])),
            ("C1".to_string(), commit("C1", &["C0"])),
        ]),
        tags: BTreeMap::new(),
        head: TreeHead {
            id: HEAD.to_string(),
            target: TRUNK.to_string(),
        },
        origin_tree: None,
    }
}

/// Export a single graph, without any origin.
pub fn export_graph(graph: &CommitGraph) -> TreeSnapshot {
    let commits = graph
        .commits()
        .map(|c| {
            let id = c.id.to_string();
            (
                id.clone(),
                TreeCommit {
                    id,
                    parents: c.parents.iter().map(ToString::to_string).collect(),
                    root_commit: c.is_root(),
                    commit_message: Some(c.meta.message.clone()),
                    author: Some(c.meta.author.clone()),
                    create_time: Some(c.meta.created_at.to_rfc3339()),
                },
            )
        })
        .collect();
    let branches = graph
        .branches()
        .map(|b| {
            (
                b.name.clone(),
                TreeBranch {
                    id: b.name.clone(),
                    target: b.target.to_string(),
                    remote_tracking_branch_id: b.remote_tracking.clone(),
                },
            )
        })
        .collect();
    let tags = graph
        .tags()
        .map(|t| {
            (
                t.name.clone(),
                TreeTag {
                    id: t.name.clone(),
                    target: t.target.to_string(),
                },
            )
        })
        .collect();
    TreeSnapshot {
        branches,
        commits,
        tags,
        head: TreeHead {
            id: HEAD.to_string(),
            target: graph.head().target.to_string(),
        },
        origin_tree: None,
    }
}

/// Export a repository pair, nesting the origin tree when present.
pub fn export_repository(repo: &Repository) -> TreeSnapshot {
    let mut tree = export_graph(&repo.local);
    tree.origin_tree = repo.origin.as_ref().map(|o| Box::new(export_graph(o)));
    tree
}

/// Export only what one branch can reach: its ancestry, the branch itself,
/// tags inside that ancestry, and HEAD attached to it.
pub fn export_for_branch(graph: &CommitGraph, branch: &str) -> Result<TreeSnapshot, TreeError> {
    let tip = graph
        .branch(branch)
        .map(|b| b.target)
        .ok_or_else(|| GraphError::NotABranch(branch.to_string()))?;
    let keep: HashSet<String> = algo::upstream_set(graph, tip)
        .into_iter()
        .map(|id| id.to_string())
        .collect();

    let mut tree = export_graph(graph);
    tree.commits.retain(|id, _| keep.contains(id));
    tree.branches.retain(|name, _| name == branch);
    tree.tags.retain(|_, tag| keep.contains(&tag.target));
    if let Some(entry) = tree.branches.get_mut(branch) {
        entry.remote_tracking_branch_id = None;
    }
    tree.head.target = branch.to_string();
    Ok(tree)
}

/// Build a live graph from a tree. Any `originTree` is ignored here.
///
/// # Errors
///
/// Fails on unparseable ids, missing parents, parent cycles, dangling refs,
/// or a tree that does not pass [`verify::fast_verify`].
pub fn build_graph(tree: &TreeSnapshot, is_origin: bool) -> Result<CommitGraph, TreeError> {
    let mut parsed: HashMap<CommitId, (Vec<CommitId>, CommitMeta)> = HashMap::new();
    for entry in tree.commits.values() {
        let id: CommitId = entry.id.parse()?;
        let parents = entry
            .parents
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<CommitId>, _>>()?;
        let created_at = entry
            .create_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        let meta = CommitMeta {
            message: entry
                .commit_message
                .clone()
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            author: entry
                .author
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            created_at,
        };
        parsed.insert(id, (parents, meta));
    }

    let mut graph = CommitGraph::new(is_origin);
    for id in parents_first(&parsed)? {
        if let Some((parents, meta)) = parsed.remove(&id) {
            graph.create_commit(id, parents, meta)?;
        }
    }

    for branch in tree.branches.values() {
        graph.create_branch(&branch.id, branch.target.parse()?)?;
    }
    for branch in tree.branches.values() {
        if let Some(remote) = &branch.remote_tracking_branch_id {
            graph.set_tracking(&branch.id, Some(remote.clone()))?;
        }
    }
    for tag in tree.tags.values() {
        graph.create_tag(&tag.id, tag.target.parse()?)?;
    }

    let head = if graph.branch(&tree.head.target).is_some() {
        HeadTarget::Branch(tree.head.target.clone())
    } else {
        let id: CommitId = tree
            .head
            .target
            .parse()
            .map_err(|_| TreeError::BadHead(tree.head.target.clone()))?;
        HeadTarget::Commit(id)
    };
    graph
        .set_head(head)
        .map_err(|_| TreeError::BadHead(tree.head.target.clone()))?;

    let result = verify::fast_verify(&graph);
    if !result.ok {
        let reasons: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
        return Err(TreeError::Invalid(reasons.join("; ")));
    }

    graph.take_journal();
    graph.set_head_history(None);
    debug!(
        commits = graph.commits().count(),
        branches = graph.branches().count(),
        origin = is_origin,
        "built graph from tree"
    );
    Ok(graph)
}

/// Order commit ids so each comes after all of its parents.
fn parents_first(
    parsed: &HashMap<CommitId, (Vec<CommitId>, CommitMeta)>,
) -> Result<Vec<CommitId>, TreeError> {
    let mut starts: Vec<CommitId> = parsed.keys().copied().collect();
    starts.sort_unstable();

    let mut done: HashSet<CommitId> = HashSet::new();
    let mut open: HashSet<CommitId> = HashSet::new();
    let mut order = Vec::with_capacity(parsed.len());

    for start in starts {
        let mut stack = vec![(start, false)];
        while let Some((id, expanded)) = stack.pop() {
            if done.contains(&id) {
                continue;
            }
            if expanded {
                open.remove(&id);
                done.insert(id);
                order.push(id);
                continue;
            }
            if !open.insert(id) {
                return Err(TreeError::Cycle(id.to_string()));
            }
            stack.push((id, true));
            let (parents, _) = parsed
                .get(&id)
                .ok_or_else(|| TreeError::MissingParent(id.to_string()))?;
            for parent in parents.iter().rev() {
                if !parsed.contains_key(parent) {
                    return Err(TreeError::MissingParent(id.to_string()));
                }
                if !done.contains(parent) {
                    stack.push((*parent, false));
                }
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORKED: &str = r#"{
      "branches": {
        "master": {"id": "master", "target": "C2", "remoteTrackingBranchID": null},
        "side": {"id": "side", "target": "C3"}
      },
      "commits": {
        "C3": {"id": "C3", "parents": ["C1"]},
        "C2": {"id": "C2", "parents": ["C1"]},
        "C1": {"id": "C1", "parents": ["C0"]},
        "C0": {"id": "C0", "parents": [], "rootCommit": true}
      },
      "tags": {"v1": {"id": "v1", "target": "C1"}},
      "HEAD": {"id": "HEAD", "target": "side"}
    }"#;

    #[test]
    fn import_then_export_keeps_structure() {
        let tree = TreeSnapshot::from_json(FORKED).unwrap();
        let graph = build_graph(&tree, false).unwrap();
        let back = export_graph(&graph);
        assert_eq!(back.branches, tree.branches);
        assert_eq!(back.tags, tree.tags);
        assert_eq!(back.head, tree.head);
        assert_eq!(back.commits["C3"].parents, vec!["C1"]);
        assert!(back.commits["C0"].root_commit);
    }

    #[test]
    fn import_does_not_leave_journal_entries() {
        let tree = TreeSnapshot::from_json(FORKED).unwrap();
        let mut graph = build_graph(&tree, false).unwrap();
        assert!(graph.take_journal().is_empty());
        assert_eq!(graph.head().previous, None);
    }

    #[test]
    fn accepts_lowercase_tracking_key() {
        let json = FORKED.replace(
            r#""side": {"id": "side", "target": "C3"}"#,
            r#""side": {"id": "side", "target": "C3", "remoteTrackingBranchId": "master"}"#,
        );
        let graph = build_graph(&TreeSnapshot::from_json(&json).unwrap(), false).unwrap();
        assert_eq!(
            graph.branch("side").unwrap().remote_tracking.as_deref(),
            Some("master")
        );
    }

    #[test]
    fn detached_head_round_trips() {
        let json = FORKED.replace(
            r#""HEAD": {"id": "HEAD", "target": "side"}"#,
            r#""HEAD": {"id": "HEAD", "target": "C2"}"#,
        );
        let graph = build_graph(&TreeSnapshot::from_json(&json).unwrap(), false).unwrap();
        assert!(graph.is_detached());
        assert_eq!(export_graph(&graph).head.target, "C2");
    }

    #[test]
    fn missing_parent_is_rejected() {
        let json = FORKED.replace(r#"["C0"]"#, r#"["C9"]"#);
        let err = build_graph(&TreeSnapshot::from_json(&json).unwrap(), false).unwrap_err();
        assert!(matches!(err, TreeError::MissingParent(_)));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let json = FORKED.replace(
            r#""C1": {"id": "C1", "parents": ["C0"]}"#,
            r#""C1": {"id": "C1", "parents": ["C3"]}"#,
        );
        let err = build_graph(&TreeSnapshot::from_json(&json).unwrap(), false).unwrap_err();
        assert!(matches!(err, TreeError::Cycle(_)));
    }

    #[test]
    fn bad_head_is_rejected() {
        let json = FORKED.replace(r#""target": "side"}"#, r#""target": "nowhere"}"#);
        let err = build_graph(&TreeSnapshot::from_json(&json).unwrap(), false).unwrap_err();
        assert!(matches!(err, TreeError::BadHead(_)));
    }

    #[test]
    fn branch_export_keeps_only_reachable_history() {
        let tree = TreeSnapshot::from_json(FORKED).unwrap();
        let graph = build_graph(&tree, false).unwrap();
        let master_only = export_for_branch(&graph, "master").unwrap();
        let mut ids: Vec<&String> = master_only.commits.keys().collect();
        ids.sort();
        assert_eq!(ids, ["C0", "C1", "C2"]);
        assert_eq!(master_only.branches.len(), 1);
        assert_eq!(master_only.head.target, "master");
        assert!(master_only.tags.contains_key("v1"));
    }

    #[test]
    fn origin_tree_is_optional_and_nested() {
        let mut tree = default_tree();
        assert!(!tree.to_json().unwrap().contains("originTree"));
        tree.origin_tree = Some(Box::new(default_tree()));
        let text = tree.to_json().unwrap();
        let back = TreeSnapshot::from_json(&text).unwrap();
        assert!(back.origin_tree.is_some());
    }
}
