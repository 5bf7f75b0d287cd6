//! engine::git
//!
//! Argument handling for the git dialect.
//!
//! Each method checks its arguments, maps them onto one or more
//! [`Session`] operations, and reports through the session. Nothing here
//! touches the graph before its arguments are known to be well-formed.

use super::command::{Args, GitMethod};
use super::error::CommandError;
use super::ops::{BranchFilter, MergeResult, Session};
use super::rebase::{parse_ordering, RebaseResult};
use super::Status;
use crate::core::algo;
use crate::core::graph::{CommitMeta, Resolved};
use crate::core::types::{CommitId, HEAD, TRUNK};
use crate::remote::{
    self, origin_of, FetchOptions, FetchSpec, OriginSeed, PushSpec, SyncError,
};
use crate::ui::messages::Notice;

/// Run one git method.
pub(crate) fn run(session: &mut Session<'_>, method: GitMethod, args: Args) -> Result<(), CommandError> {
    match method {
        GitMethod::Commit => commit(session, &args),
        GitMethod::Add => {
            session.noop(Notice::StagingUnsupported);
            Ok(())
        }
        GitMethod::Checkout => checkout(session, &args, "-b"),
        GitMethod::Switch => checkout(session, &args, "-c"),
        GitMethod::Branch => branch(session, &args),
        GitMethod::Tag => tag(session, &args),
        GitMethod::Merge => {
            args.validate_bounds(&args.general, 1, 1, None)?;
            session.merge(&args.general[0], args.has("--no-ff"))?;
            Ok(())
        }
        GitMethod::Rebase => rebase(session, &args),
        GitMethod::CherryPick => {
            args.validate_bounds(&args.general, 1, usize::MAX, None)?;
            session.cherry_pick(&args.general)?;
            Ok(())
        }
        GitMethod::Revert => {
            args.validate_bounds(&args.general, 1, usize::MAX, None)?;
            session.revert(&args.general)?;
            Ok(())
        }
        GitMethod::Reset => reset(session, &args),
        GitMethod::Describe => {
            let spec = args.one_arg_implied_head(&args.general, None)?;
            let text = session.describe(&spec)?;
            session.say(text);
            Ok(())
        }
        GitMethod::Log => {
            let specs = if args.general.is_empty() {
                vec![HEAD.to_string()]
            } else {
                args.general.clone()
            };
            let text = session.log(&specs)?;
            session.say(text);
            Ok(())
        }
        GitMethod::RevList => {
            args.validate_bounds(&args.general, 1, usize::MAX, None)?;
            let text = session.rev_list(&args.general)?;
            session.say(text);
            Ok(())
        }
        GitMethod::Show => {
            let spec = args.one_arg_implied_head(&args.general, None)?;
            let text = session.show(&spec)?;
            session.say(text);
            Ok(())
        }
        GitMethod::Status => {
            args.no_general_args()?;
            let text = session.status();
            session.say(text);
            Ok(())
        }
        GitMethod::Fetch => fetch(session, &args),
        GitMethod::Push => push(session, &args),
        GitMethod::Pull => pull(session, &args),
        GitMethod::Clone => {
            args.no_general_args()?;
            let links = remote::make_origin(session.repo, OriginSeed::Full)?;
            for link in links {
                session.warn(Notice::TrackingSet {
                    local: link.local,
                    remote: link.remote,
                });
            }
            Ok(())
        }
        GitMethod::FakeTeamwork => fake_teamwork(session, &args),
        GitMethod::Remote => {
            args.no_general_args()?;
            if session.repo.origin.is_none() {
                session.status = Status::NoOp;
                session.message = Some(String::new());
            } else {
                session.say(remote::describe_remotes(args.has("-v")));
            }
            Ok(())
        }
    }
}

fn strip_quotes(message: &str) -> &str {
    let trimmed = message.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|m| m.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|m| m.strip_suffix('\'')))
        .unwrap_or(trimmed)
}

fn commit(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    args.no_general_args()?;
    if let Some(values) = args.option("-am") {
        if args.has("-a") || args.has("--all") || args.has("-m") {
            return Err(CommandError::validation(
                "you can't have -am with another -m or -a flag",
            ));
        }
        args.validate_bounds(values, 1, 1, Some("-am"))?;
    }
    if args.has("-a") || args.has("--all") {
        session.warn(Notice::AddNotNeeded);
    }
    if let Some(values) = args.option("-m") {
        args.validate_bounds(values, 1, 1, Some("-m"))?;
    }
    if let Some(values) = args.option("--amend") {
        args.validate_bounds(values, 0, 0, Some("--amend"))?;
    }

    let message = args
        .option("-m")
        .or_else(|| args.option("-am"))
        .and_then(|values| values.first())
        .map(|m| strip_quotes(m).to_string());
    session.commit(args.has("--amend"), message.as_deref())?;
    Ok(())
}

fn checkout(session: &mut Session<'_>, args: &Args, create_flag: &str) -> Result<(), CommandError> {
    if args.has(create_flag) {
        let values = args.option_then_general(create_flag);
        let (name, start) = args.two_args_implied_head(&values, Some(create_flag))?;
        let name = session.create_branch(&name, &start)?;
        return session.checkout(&name);
    }
    if args.has("-B") {
        let values = args.option_then_general("-B");
        let (name, start) = args.two_args_implied_head(&values, Some("-B"))?;
        let name = session.valid_name_if_needed(&name)?;
        session.force_branch(&name, &start)?;
        return session.checkout(&name);
    }
    if args.has("-") {
        return session.checkout_previous();
    }
    args.validate_bounds(&args.general, 1, 1, None)?;
    session.checkout(&args.general[0])
}

fn branch(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    let delete_flag = ["-d", "-D"].into_iter().find(|f| args.has(f));
    if let Some(flag) = delete_flag {
        let names = args.option_then_general(flag);
        args.validate_bounds(&names, 1, usize::MAX, Some(flag))?;
        for name in &names {
            session.delete_branch(name)?;
        }
        return Ok(());
    }

    if args.has("-u") {
        let values = args.option_then_general("-u");
        args.validate_bounds(&values, 1, 2, Some("-u"))?;
        let local = values.get(1).map(String::as_str).unwrap_or(HEAD);
        return session.set_upstream(&values[0], local);
    }

    if args.has("--contains") {
        let values = args.option_then_general("--contains");
        args.validate_bounds(&values, 1, 1, Some("--contains"))?;
        let text = session.branches_containing(&values[0])?;
        session.say(text);
        return Ok(());
    }

    let force_flag = ["-f", "--force"].into_iter().find(|f| args.has(f));
    if let Some(flag) = force_flag {
        let values = args.option_then_general(flag);
        let (name, start) = args.two_args_implied_head(&values, Some(flag))?;
        let name = session.valid_name_if_needed(&name)?;
        return session.force_branch(&name, &start);
    }

    if args.general.is_empty() {
        let filter = if args.has("-a") {
            BranchFilter::All
        } else if args.has("-r") {
            BranchFilter::Remote
        } else {
            BranchFilter::Local
        };
        let text = session.list_branches(filter);
        session.say(text);
        return Ok(());
    }

    let (name, start) = args.two_args_implied_head(&args.general, None)?;
    session.create_branch(&name, &start)?;
    Ok(())
}

fn tag(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    if let Some(values) = args.option("-d") {
        args.validate_bounds(values, 1, 1, Some("-d"))?;
        return session.delete_tag(&values[0]);
    }
    if args.general.is_empty() {
        let text = session.list_tags();
        session.say(text);
        return Ok(());
    }
    let (name, start) = args.two_args_implied_head(&args.general, None)?;
    session.create_tag(&name, &start)?;
    Ok(())
}

fn rebase(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    if args.has("-i") {
        let values = args.option_then_general("-i");
        let (target, current) = args.two_args_implied_head(&values, Some("-i"))?;

        let suggested = args
            .option("--solution-ordering")
            .and_then(|v| v.first())
            .map(String::as_str);
        let plan = session.plan_interactive(&target, &current, suggested, args.has("--aboveAll"))?;
        if plan.candidates.is_empty() {
            session.noop(Notice::NothingToRebase);
            return Ok(());
        }

        if let Some(values) = args.option("--interactive-test") {
            let order: Vec<CommitId> = match values.first() {
                None => plan.candidates.clone(),
                Some(text) => parse_ordering(text, &plan.candidates)?,
            };
            return session.apply_plan(&plan, &order);
        }

        session.status = Status::Paused;
        session.plan = Some(plan);
        return Ok(());
    }

    let preserve = args.has("-p") || args.has("--preserve-merges");
    let (target, current) = args.two_args_implied_head(&args.general, None)?;
    session.rebase(&target, &current, preserve)?;
    Ok(())
}

fn reset(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    if args.has("--soft") {
        return Err(CommandError::validation(
            session.render(&Notice::StagingUnsupported),
        ));
    }
    let mut targets = args.general.clone();
    if let Some(values) = args.option("--hard") {
        session.warn(Notice::HardIsDefault);
        targets.extend(values.iter().cloned());
    }
    args.validate_bounds(&targets, 1, 1, None)?;
    session.reset(&targets[0])
}

// ---- origin commands ---------------------------------------------------

fn require_origin(session: &Session<'_>) -> Result<(), CommandError> {
    origin_of(session.repo)?;
    Ok(())
}

fn split_refspec(refspec: &str) -> Option<(&str, &str)> {
    refspec.split_once(':')
}

fn fetch(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    require_origin(session)?;
    let spec = match args.two_args_for_origin()? {
        None => FetchSpec::All,
        Some(refspec) => match split_refspec(&refspec) {
            Some(("", destination)) => {
                FetchSpec::CreateAtHead(session.valid_name(destination)?)
            }
            Some((source, destination)) => FetchSpec::Refspec {
                source: source.to_string(),
                destination: session.valid_name_if_needed(destination)?,
            },
            None => FetchSpec::Branch(refspec),
        },
    };
    let report = remote::fetch(session.repo, &spec, FetchOptions::default())?;
    if report.is_noop() {
        session.noop(Notice::UpToDate);
    }
    Ok(())
}

fn push(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    require_origin(session)?;
    let force = args.has("--force");

    let spec = match args.two_args_for_origin()? {
        Some(refspec) if refspec.contains(':') => {
            let (source, destination) = split_refspec(&refspec).unwrap_or_default();
            let destination = if session.local().has_ref(&remote::remote_name(destination)) {
                destination.to_string()
            } else {
                session.valid_name(destination)?
            };
            if source.is_empty() && !session.local().has_ref(&remote::remote_name(&destination)) {
                return Err(SyncError::DeleteMissing(destination).into());
            }
            PushSpec {
                source: source.to_string(),
                destination,
                force,
            }
        }
        explicit => {
            let source = match explicit {
                Some(source) => source,
                None => session.current_name(),
            };
            let destination = match session.local().resolve_ref(&source)? {
                Resolved::Branch(name) => {
                    match remote::sync::tracked_origin_branch(session.local(), &name) {
                        Ok(tracked) => tracked,
                        Err(_) => session.valid_name(&name)?,
                    }
                }
                _ => session.valid_name(&source)?,
            };
            PushSpec {
                source,
                destination,
                force,
            }
        }
    };

    let report = remote::push(session.repo, &spec)?;
    if let Some(link) = report.tracking {
        session.warn(Notice::TrackingSet {
            local: link.local,
            remote: link.remote,
        });
    }
    if report.up_to_date {
        session.noop(Notice::UpToDate);
    }
    Ok(())
}

fn pull(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    require_origin(session)?;

    let (spec, destination) = match args.two_args_for_origin()? {
        Some(refspec) if refspec.contains(':') => {
            let (source, destination) = split_refspec(&refspec).unwrap_or_default();
            let destination = session.valid_name_if_needed(destination)?;
            (
                FetchSpec::Refspec {
                    source: source.to_string(),
                    destination: destination.clone(),
                },
                destination,
            )
        }
        Some(source) => {
            let destination = remote::remote_name(&source);
            (FetchSpec::Branch(source), destination)
        }
        None => {
            let branch = session.local().head_branch().map(str::to_string).ok_or_else(|| {
                CommandError::state("pull without arguments needs HEAD on a branch")
            })?;
            let source = remote::sync::tracked_origin_branch(session.local(), &branch)?;
            let destination = remote::remote_name(&source);
            (FetchSpec::Branch(source), destination)
        }
    };

    let local = session.current_location()?;
    let fetched = remote::fetch(
        session.repo,
        &spec,
        FetchOptions {
            tolerate_no_ff: true,
        },
    )?;

    let graph = session.local();
    let remote_commit = graph.commit_from_ref(&destination)?;
    let local_commit = graph.commit_of(&local)?;

    if args.has("--rebase") {
        if algo::is_upstream_of(graph, remote_commit, local_commit) {
            up_to_date(session, fetched.is_noop());
            return Ok(());
        }
        if algo::is_upstream_of(graph, local_commit, remote_commit) {
            session.repo.local.set_target_location(&local, remote_commit)?;
            return session.checkout_resolved(&fast_forwarded(&local, remote_commit));
        }
        let current = local.name();
        if session.rebase(&destination, &current, false)? == RebaseResult::NothingToRebase {
            session.status = Status::Success;
            session.message = None;
            session.repo.local.set_target_location(&local, remote_commit)?;
            session.checkout_resolved(&fast_forwarded(&local, remote_commit))?;
        }
        return Ok(());
    }

    if algo::is_upstream_of(graph, remote_commit, local_commit) {
        up_to_date(session, fetched.is_noop());
        return Ok(());
    }
    if session.merge(&destination, false)? == MergeResult::UpToDate {
        up_to_date(session, fetched.is_noop());
    }
    Ok(())
}

/// Report "up to date", as a no-op only when the fetch changed nothing too.
fn up_to_date(session: &mut Session<'_>, fetch_was_noop: bool) {
    if fetch_was_noop {
        session.noop(Notice::UpToDate);
    } else {
        let text = session.render(&Notice::UpToDate);
        session.say(text);
    }
}

/// Where HEAD should land after moving `local` to `commit`.
fn fast_forwarded(local: &Resolved, commit: CommitId) -> Resolved {
    match local {
        Resolved::Commit(_) => Resolved::Commit(commit),
        other => other.clone(),
    }
}

fn fake_teamwork(session: &mut Session<'_>, args: &Args) -> Result<(), CommandError> {
    require_origin(session)?;
    args.validate_bounds(&args.general, 0, 2, None)?;

    let parse_count = |text: &str| {
        text.parse::<usize>()
            .map_err(|_| CommandError::validation(format!("Bad numeric argument: {text}")))
    };
    let (branch, count) = match args.general.as_slice() {
        [] => (TRUNK.to_string(), 1),
        [only] if only.chars().all(|c| c.is_ascii_digit()) => (TRUNK.to_string(), parse_count(only)?),
        [only] => (only.clone(), 1),
        [branch, count, ..] => (branch.clone(), parse_count(count)?),
    };

    let message = session.render(&Notice::TeamworkMessage {
        branch: branch.clone(),
    });
    let author = session.settings.author.clone();
    remote::fake_teamwork(session.repo, &branch, count, || {
        CommitMeta::now(message.clone(), author.clone())
    })?;
    Ok(())
}
