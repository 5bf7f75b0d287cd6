//! default-tree command - Print the starting tree

use crate::tree::default_tree as starting_tree;
use anyhow::{Context as _, Result};

/// Print the default two-commit tree as JSON.
pub fn default_tree(pretty: bool) -> Result<()> {
    let tree = starting_tree();
    let rendered = if pretty {
        tree.to_json_pretty()
    } else {
        tree.to_json()
    };
    let text = rendered.context("failed to serialize the default tree")?;
    println!("{text}");
    Ok(())
}
