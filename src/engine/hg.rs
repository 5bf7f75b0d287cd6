//! engine::hg
//!
//! The hg dialect, expressed as rewritten git invocations.
//!
//! Most methods reshape their arguments and hand off to [`super::git`].
//! Rebase is the exception: after the git replay it re-parents the
//! surrounding commits onto the rewrites, moves every affected bookmark,
//! and prunes what nothing reaches any more. That keeps the graph free of
//! obsolete commits, which hg users expect.

use super::command::{Args, GitMethod, HgMethod};
use super::error::CommandError;
use super::git;
use super::ops::Session;
use super::rebase::RebaseResult;
use crate::core::algo;
use crate::core::types::{CommitId, HEAD};
use crate::ui::messages::Notice;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

type Options = BTreeMap<String, Vec<String>>;

fn delegate(
    session: &mut Session<'_>,
    method: GitMethod,
    general: Vec<String>,
    options: Options,
) -> Result<(), CommandError> {
    let args = Args::new(method.name(), general, options, method.options())?;
    git::run(session, method, args)
}

fn only(flag: &str, values: Vec<String>) -> Options {
    BTreeMap::from([(flag.to_string(), values)])
}

/// Run one hg method.
pub(crate) fn run(session: &mut Session<'_>, method: HgMethod, mut args: Args) -> Result<(), CommandError> {
    match method {
        HgMethod::Commit => {
            if args.options.remove("-A").is_some() {
                session.warn(Notice::HgAddRemoveNotNeeded);
            }
            delegate(session, GitMethod::Commit, args.general, args.options)
        }
        HgMethod::Status => Err(CommandError::validation(
            "hg status is not supported here; use hg summary",
        )),
        HgMethod::Export => {
            args.map_dot_to_head();
            delegate(session, GitMethod::Show, args.general, Options::new())
        }
        HgMethod::Graft => {
            args.no_general_args()?;
            args.prepend_option_r();
            delegate(session, GitMethod::CherryPick, args.general, Options::new())
        }
        HgMethod::Log => {
            args.no_general_args()?;
            if !args.has("-f") {
                return Err(CommandError::validation(
                    "hg log needs -f; only followed history is shown",
                ));
            }
            args.map_dot_to_head();
            let general = args.option_then_general("-f");
            delegate(session, GitMethod::Log, general, Options::new())
        }
        HgMethod::Bookmark => bookmark(session, args),
        HgMethod::Rebase => rebase(session, args),
        HgMethod::Update => {
            args.append_option_r();
            delegate(session, GitMethod::Checkout, args.general, Options::new())
        }
        HgMethod::Backout => {
            args.prepend_option_r();
            delegate(session, GitMethod::Revert, args.general, Options::new())
        }
        HgMethod::Histedit => {
            args.validate_bounds(&args.general, 1, 1, None)?;
            delegate(session, GitMethod::Rebase, Vec::new(), only("-i", args.general))
        }
        HgMethod::Pull => delegate(session, GitMethod::Pull, args.general, Options::new()),
        HgMethod::Summary => delegate(session, GitMethod::Branch, Vec::new(), Options::new()),
    }
}

fn bookmark(session: &mut Session<'_>, args: Args) -> Result<(), CommandError> {
    let revs = args.option("-r").map(<[String]>::to_vec);
    let deletes = args.option("-d").map(<[String]>::to_vec);
    if revs.is_some() && deletes.is_some() {
        return Err(CommandError::validation("bookmark -d cannot be combined with -r"));
    }

    let given = args.general.len()
        + revs.as_ref().map_or(0, Vec::len)
        + deletes.as_ref().map_or(0, Vec::len);
    if given == 0 {
        return delegate(session, GitMethod::Branch, Vec::new(), Options::new());
    }

    if deletes.is_some() {
        let names = args.option_then_general("-d");
        return delegate(session, GitMethod::Branch, Vec::new(), only("-D", names));
    }

    let force = args.has("-f");
    match revs {
        Some(revs) => {
            args.validate_bounds(&revs, 1, 1, Some("-r"))?;
            args.validate_bounds(&args.general, 1, 1, None)?;
            let pair = vec![args.general[0].clone(), revs[0].clone()];
            if force {
                delegate(session, GitMethod::Branch, Vec::new(), only("-f", pair))
            } else {
                delegate(session, GitMethod::Branch, pair, Options::new())
            }
        }
        None if force => {
            let values = args.option_then_general("-f");
            delegate(session, GitMethod::Branch, Vec::new(), only("-f", values))
        }
        None => {
            args.validate_bounds(&args.general, 1, 1, None)?;
            delegate(session, GitMethod::Checkout, Vec::new(), only("-b", args.general))
        }
    }
}

fn rebase(session: &mut Session<'_>, mut args: Args) -> Result<(), CommandError> {
    args.map_dot_to_head();
    let destination = args
        .option("-d")
        .map(<[String]>::to_vec)
        .ok_or_else(|| CommandError::validation("hg rebase needs a destination: -d <rev>"))?;
    args.validate_bounds(&destination, 1, 1, Some("-d"))?;
    let destination = destination[0].clone();

    let base_flag = if args.has("-s") { "-s" } else { "-b" };
    let base = match args.option(base_flag) {
        Some(values) => {
            args.validate_bounds(values, 1, 1, Some(base_flag))?;
            values[0].clone()
        }
        None => HEAD.to_string(),
    };

    let graph = session.local();
    let dest_commit = graph.commit_from_ref(&destination)?;
    let base_commit = graph.commit_from_ref(&base)?;

    let mut affected: HashSet<CommitId> = algo::downstream_set(graph, base_commit);
    let stop = algo::upstream_set(graph, dest_commit);
    for id in algo::diff_from_set(graph, &stop, base_commit) {
        affected.extend(algo::downstream_set(graph, id));
    }
    let bookmarks = session.branches_reaching(&affected);

    let result = session.rebase(&destination, &base, false)?;
    if !matches!(result, RebaseResult::Rebased(_)) {
        return Ok(());
    }

    let mut ordered: Vec<CommitId> = affected.into_iter().collect();
    ordered.sort_unstable();
    for id in ordered {
        let parent = match session.local().parents_of(&id) {
            [parent] => *parent,
            _ => continue,
        };
        let newest = session.local().most_recent_rewrite(parent);
        if newest != parent {
            debug!(commit = %id, from = %parent, to = %newest, "reparenting onto rewrite");
            session.repo.local.rewrite_parents(id, vec![newest])?;
        }
    }

    session.update_branches_to_rewrites(&bookmarks)?;
    session.prune();
    Ok(())
}

/// Bring a graph shaped by git commands in line with hg expectations.
///
/// Every branch moves to the newest rewrite of its target, then anything
/// unreachable is pruned.
pub(crate) fn enter_hg_mode(session: &mut Session<'_>) -> Result<(), CommandError> {
    let branches: Vec<String> = session.local().branches().map(|b| b.name.clone()).collect();
    session.update_branches_to_rewrites(&branches)?;
    session.prune();
    Ok(())
}
