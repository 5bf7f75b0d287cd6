//! run command - Execute a script of commands against a tree

use super::read_tree;
use crate::cli::Context;
use crate::engine::{CommandRequest, Engine};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};
use std::path::Path;

/// Short human label for a request, e.g. `git checkout -b bugFix`.
pub fn label(request: &CommandRequest) -> String {
    let mut parts = vec![request.dialect.to_string(), request.method.clone()];
    for (flag, values) in &request.options {
        parts.push(flag.clone());
        parts.extend(values.iter().cloned());
    }
    parts.extend(request.general_args.iter().cloned());
    parts.join(" ")
}

/// Run every command in `script`, then emit the final tree.
///
/// The first failing command stops the script.
pub fn run(
    ctx: &Context,
    tree: Option<&Path>,
    script: &Path,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut engine = match tree {
        Some(path) => Engine::from_tree(&read_tree(path)?, ctx.engine.clone()),
        None => Engine::new(ctx.engine.clone()),
    }
    .context("failed to set up the repository")?;

    let text = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read script '{}'", script.display()))?;
    let requests: Vec<CommandRequest> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse script '{}'", script.display()))?;

    for (index, request) in requests.iter().enumerate() {
        let label = label(request);
        let outcome = engine
            .execute(request)
            .with_context(|| format!("command {} ({label}) failed", index + 1))?;

        if json {
            let line = serde_json::to_string(&outcome).context("failed to serialize outcome")?;
            output::print(line, ctx.verbosity);
        } else {
            output::print(output::format_outcome(&label, &outcome), ctx.verbosity);
            if ctx.verbosity == Verbosity::Debug {
                for change in output::format_changes(&outcome) {
                    output::print(format!("  ~ {change}"), ctx.verbosity);
                }
            }
        }
        for warning in &outcome.warnings {
            output::warn(warning, ctx.verbosity);
        }
    }

    let tree = engine
        .export_tree()
        .to_json_pretty()
        .context("failed to serialize the final tree")?;
    match out {
        Some(path) => std::fs::write(path, tree)
            .with_context(|| format!("failed to write tree to '{}'", path.display()))?,
        None => println!("{tree}"),
    }
    Ok(())
}
