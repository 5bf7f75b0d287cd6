//! tree::compare
//!
//! Decide whether a candidate tree satisfies a goal tree.
//!
//! # Policies
//!
//! | Policy | Checks |
//! |--------|--------|
//! | `Default` | HEAD target, every goal branch, tag set |
//! | `OnlyMaster` | the `master` branch |
//! | `AllBranchesEnforceCleanup` | every branch in either tree |
//! | `OnlyBranches` | every goal branch |
//! | `AllBranchesHashAgnostic` | every branch in either tree, ids compared by base |
//! | `OnlyMasterHashAgnostic` | `master`, ids compared by base |
//! | `OnlyMasterHashAgnosticWithAsserts` | as above, plus caller predicates |
//!
//! Branch comparison is structural: the branch records must match, then the
//! commits are walked parent by parent from both targets. Parent lists are
//! compared in sorted order. A parent present on one side only is a
//! mismatch.
//!
//! Names are compared case-insensitively. When the goal carries an origin
//! tree, the candidate must carry one too and it is compared with the
//! origin policy (or the main policy when none is given).

use super::serialize::{TreeCommit, TreeSnapshot};
use crate::core::types::{CommitId, TRUNK};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// How two trees are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparePolicy {
    #[default]
    Default,
    OnlyMaster,
    AllBranchesEnforceCleanup,
    OnlyBranches,
    AllBranchesHashAgnostic,
    OnlyMasterHashAgnostic,
    OnlyMasterHashAgnosticWithAsserts,
}

impl ComparePolicy {
    /// Every policy, in declaration order.
    pub const ALL: [ComparePolicy; 7] = [
        ComparePolicy::Default,
        ComparePolicy::OnlyMaster,
        ComparePolicy::AllBranchesEnforceCleanup,
        ComparePolicy::OnlyBranches,
        ComparePolicy::AllBranchesHashAgnostic,
        ComparePolicy::OnlyMasterHashAgnostic,
        ComparePolicy::OnlyMasterHashAgnosticWithAsserts,
    ];

    /// The kebab-case name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparePolicy::Default => "default",
            ComparePolicy::OnlyMaster => "only-master",
            ComparePolicy::AllBranchesEnforceCleanup => "all-branches-enforce-cleanup",
            ComparePolicy::OnlyBranches => "only-branches",
            ComparePolicy::AllBranchesHashAgnostic => "all-branches-hash-agnostic",
            ComparePolicy::OnlyMasterHashAgnostic => "only-master-hash-agnostic",
            ComparePolicy::OnlyMasterHashAgnosticWithAsserts => {
                "only-master-hash-agnostic-with-asserts"
            }
        }
    }
}

impl fmt::Display for ComparePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown policy '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Base id to deepest rewrite depth seen on a branch's ancestry.
pub type DepthMap = BTreeMap<String, u32>;

/// A caller-supplied check over a branch's [`DepthMap`].
pub type BranchAssert = Box<dyn Fn(&DepthMap) -> bool>;

/// A goal comparison request.
#[derive(Default)]
pub struct GoalSpec {
    pub policy: ComparePolicy,
    pub origin_policy: Option<ComparePolicy>,
    asserts: BTreeMap<String, Vec<BranchAssert>>,
}

impl GoalSpec {
    /// Compare with one policy for both trees.
    pub fn new(policy: ComparePolicy) -> Self {
        Self {
            policy,
            origin_policy: None,
            asserts: BTreeMap::new(),
        }
    }

    /// Use a separate policy for the origin trees.
    pub fn with_origin_policy(mut self, policy: ComparePolicy) -> Self {
        self.origin_policy = Some(policy);
        self
    }

    /// Add a predicate evaluated against `branch` under the asserts policy.
    pub fn with_assert(
        mut self,
        branch: &str,
        check: impl Fn(&DepthMap) -> bool + 'static,
    ) -> Self {
        self.asserts
            .entry(branch.to_ascii_lowercase())
            .or_default()
            .push(Box::new(check));
        self
    }
}

impl fmt::Debug for GoalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalSpec")
            .field("policy", &self.policy)
            .field("origin_policy", &self.origin_policy)
            .field("asserts", &self.asserts.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether `candidate` satisfies `goal` under `spec`.
///
/// # Example
///
/// ```
/// use gitsim::tree::{default_tree, trees_match, ComparePolicy, GoalSpec};
///
/// let goal = default_tree();
/// let mut candidate = default_tree();
/// assert!(trees_match(&goal, &candidate, &GoalSpec::default()));
///
/// candidate.head.target = "C1".into();
/// assert!(!trees_match(&goal, &candidate, &GoalSpec::default()));
/// assert!(trees_match(&goal, &candidate, &GoalSpec::new(ComparePolicy::OnlyMaster)));
/// ```
pub fn trees_match(goal: &TreeSnapshot, candidate: &TreeSnapshot, spec: &GoalSpec) -> bool {
    let goal = normalize(goal);
    let candidate = normalize(candidate);

    match (&goal.origin_tree, &candidate.origin_tree) {
        (None, None) => compare_shallow(&goal, &candidate, spec.policy, &spec.asserts),
        (Some(goal_origin), Some(candidate_origin)) => {
            compare_shallow(&goal, &candidate, spec.policy, &spec.asserts)
                && compare_shallow(
                    goal_origin,
                    candidate_origin,
                    spec.origin_policy.unwrap_or(spec.policy),
                    &BTreeMap::new(),
                )
        }
        _ => false,
    }
}

/// Strict equality of the stored fields, ignoring commit metadata.
pub fn trees_equal(goal: &TreeSnapshot, candidate: &TreeSnapshot) -> bool {
    let goal = normalize(goal);
    let candidate = normalize(candidate);
    goal.branches == candidate.branches
        && goal.tags == candidate.tags
        && goal.head.target == candidate.head.target
        && reduced_commits(&goal) == reduced_commits(&candidate)
        && match (&goal.origin_tree, &candidate.origin_tree) {
            (None, None) => true,
            (Some(a), Some(b)) => trees_equal(a, b),
            _ => false,
        }
}

fn reduced_commits(tree: &TreeSnapshot) -> BTreeMap<String, (bool, Vec<String>)> {
    tree.commits
        .iter()
        .map(|(id, c)| (id.clone(), (c.root_commit, sorted_parents(c))))
        .collect()
}

fn compare_shallow(
    goal: &TreeSnapshot,
    candidate: &TreeSnapshot,
    policy: ComparePolicy,
    asserts: &BTreeMap<String, Vec<BranchAssert>>,
) -> bool {
    match policy {
        ComparePolicy::Default => {
            goal.head.target == candidate.head.target
                && goal_branches(goal)
                    .iter()
                    .all(|b| compare_branch(goal, candidate, b, false))
                && goal.tags == candidate.tags
        }
        ComparePolicy::OnlyMaster => compare_branch(goal, candidate, TRUNK, false),
        ComparePolicy::AllBranchesEnforceCleanup => all_branches(goal, candidate)
            .iter()
            .all(|b| compare_branch(goal, candidate, b, false)),
        ComparePolicy::OnlyBranches => goal_branches(goal)
            .iter()
            .all(|b| compare_branch(goal, candidate, b, false)),
        ComparePolicy::AllBranchesHashAgnostic => all_branches(goal, candidate)
            .iter()
            .all(|b| compare_branch(goal, candidate, b, true)),
        ComparePolicy::OnlyMasterHashAgnostic => compare_branch(goal, candidate, TRUNK, true),
        ComparePolicy::OnlyMasterHashAgnosticWithAsserts => {
            compare_branch(goal, candidate, TRUNK, true)
                && asserts.iter().all(|(branch, checks)| {
                    depth_map(candidate, branch)
                        .map(|map| checks.iter().all(|check| check(&map)))
                        .unwrap_or(false)
                })
        }
    }
}

fn goal_branches(goal: &TreeSnapshot) -> Vec<String> {
    goal.branches.keys().cloned().collect()
}

fn all_branches(goal: &TreeSnapshot, candidate: &TreeSnapshot) -> Vec<String> {
    goal.branches
        .keys()
        .chain(candidate.branches.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn compare_branch(goal: &TreeSnapshot, candidate: &TreeSnapshot, name: &str, agnostic: bool) -> bool {
    let (Some(a), Some(b)) = (goal.branches.get(name), candidate.branches.get(name)) else {
        return false;
    };
    if agnostic {
        if base_id(&a.target) != base_id(&b.target) {
            return false;
        }
    } else if a != b {
        return false;
    }
    walk_commits(goal, candidate, &a.target, &b.target, agnostic)
}

/// Walk both ancestries in lockstep, pairing parents by sorted position.
fn walk_commits(
    goal: &TreeSnapshot,
    candidate: &TreeSnapshot,
    from_goal: &str,
    from_candidate: &str,
    agnostic: bool,
) -> bool {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut stack = vec![(from_goal.to_string(), from_candidate.to_string())];
    while let Some(pair) = stack.pop() {
        if !seen.insert(pair.clone()) {
            continue;
        }
        let (Some(a), Some(b)) = (goal.commits.get(&pair.0), candidate.commits.get(&pair.1)) else {
            return false;
        };
        let (parents_a, parents_b) = (sorted_parents(a), sorted_parents(b));
        let same = if agnostic {
            base_id(&a.id) == base_id(&b.id) && a.root_commit == b.root_commit
        } else {
            a.id == b.id && a.root_commit == b.root_commit && parents_a == parents_b
        };
        if !same {
            return false;
        }
        for i in 0..parents_a.len().max(parents_b.len()) {
            match (parents_a.get(i), parents_b.get(i)) {
                (Some(pa), Some(pb)) => stack.push((pa.clone(), pb.clone())),
                _ => return false,
            }
        }
    }
    true
}

fn sorted_parents(commit: &TreeCommit) -> Vec<String> {
    let mut parents = commit.parents.clone();
    parents.sort();
    parents
}

fn base_id(id: &str) -> String {
    id.parse::<CommitId>()
        .map(|c| c.base().to_string())
        .unwrap_or_else(|_| id.to_string())
}

/// The depth map for one branch of a tree, `None` when the branch is absent.
pub fn depth_map(tree: &TreeSnapshot, branch: &str) -> Option<DepthMap> {
    let start = &tree.branches.get(branch)?.target;
    let mut map = DepthMap::new();
    let mut seen = HashSet::new();
    let mut stack = vec![start.clone()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if let Ok(parsed) = id.parse::<CommitId>() {
            let entry = map.entry(parsed.base().to_string()).or_insert(0);
            *entry = (*entry).max(parsed.rewrite_depth());
        }
        if let Some(commit) = tree.commits.get(&id) {
            stack.extend(commit.parents.iter().cloned());
        }
    }
    Some(map)
}

/// Lowercase branch names and the HEAD target. Tracking ids keep their case.
fn normalize(tree: &TreeSnapshot) -> TreeSnapshot {
    let mut out = tree.clone();
    out.head.target = out.head.target.to_ascii_lowercase();
    out.branches = tree
        .branches
        .iter()
        .map(|(name, branch)| {
            let mut branch = branch.clone();
            branch.id = branch.id.to_ascii_lowercase();
            (name.to_ascii_lowercase(), branch)
        })
        .collect();
    out.origin_tree = tree.origin_tree.as_ref().map(|o| Box::new(normalize(o)));
    out
}
