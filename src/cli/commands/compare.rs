//! compare command - Check a tree against a goal

use super::read_tree;
use crate::cli::Context;
use crate::tree::{trees_match, ComparePolicy, GoalSpec};
use crate::ui::output;
use anyhow::{bail, Result};
use std::path::Path;

/// Compare `tree` against `goal` under the given policies.
///
/// Prints `match` on success and fails otherwise.
pub fn compare(
    ctx: &Context,
    goal: &Path,
    tree: &Path,
    policy: ComparePolicy,
    origin_policy: Option<ComparePolicy>,
) -> Result<()> {
    let goal = read_tree(goal)?;
    let candidate = read_tree(tree)?;

    let mut spec = GoalSpec::new(policy);
    if let Some(origin_policy) = origin_policy {
        spec = spec.with_origin_policy(origin_policy);
    }
    tracing::debug!(%policy, ?origin_policy, "comparing trees");

    if trees_match(&goal, &candidate, &spec) {
        output::print("match", ctx.verbosity);
        Ok(())
    } else {
        bail!("trees do not match under policy {policy}")
    }
}
