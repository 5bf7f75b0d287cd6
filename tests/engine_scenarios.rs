//! Integration tests for command execution.
//!
//! These tests drive the engine through structured requests, the way a
//! caller would, and check the resulting graphs and outcomes.

use gitsim::core::graph::HeadTarget;
use gitsim::core::types::CommitId;
use gitsim::engine::{CommandRequest, Dialect, Engine, EngineConfig, ErrorKind, Outcome, Status};

// =============================================================================
// Test Fixtures
// =============================================================================

fn id(s: &str) -> CommitId {
    s.parse().unwrap()
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

fn exec(engine: &mut Engine, request: CommandRequest) -> Outcome {
    engine
        .execute(&request)
        .unwrap_or_else(|err| panic!("{request:?} failed: {err}"))
}

fn target_of(engine: &Engine, branch: &str) -> CommitId {
    engine.repository().local.branch(branch).unwrap().target
}

fn parents(engine: &Engine, commit: &str) -> Vec<CommitId> {
    engine.repository().local.parents_of(&id(commit)).to_vec()
}

/// master: C0 - C1 - C3, bugFix: C1 - C2, HEAD on master.
fn diverged() -> Engine {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["bugFix"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("checkout").with_args(["master"]));
    exec(&mut e, CommandRequest::git("commit"));
    e
}

// =============================================================================
// Commits and HEAD
// =============================================================================

#[test]
fn commit_allocates_next_id_on_current_branch() {
    let mut e = engine();
    let outcome = exec(&mut e, CommandRequest::git("commit").with_option("-m", ["\"first\""]));
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(target_of(&e, "master"), id("C2"));
    let commit = e.repository().local.commit(&id("C2")).unwrap().clone();
    assert_eq!(commit.meta.message, "first");
}

#[test]
fn amend_replaces_head_commit() {
    let mut e = engine();
    exec(
        &mut e,
        CommandRequest::git("commit")
            .with_option("--amend", Vec::<String>::new())
            .with_option("-m", ["fixup"]),
    );
    assert_eq!(target_of(&e, "master"), id("C1'"));
    assert_eq!(parents(&e, "C1'"), vec![id("C0")]);
}

#[test]
fn amend_on_root_fails() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_args(["C0"]));
    let err = e
        .execute(&CommandRequest::git("commit").with_option("--amend", Vec::<String>::new()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn rewriting_a_commit_at_maximum_depth_fails_cleanly() {
    let tree = gitsim::tree::TreeSnapshot::from_json(
        r#"{
          "branches": {"master": {"id": "master", "target": "C1'^4294967295"}},
          "commits": {
            "C0": {"id": "C0", "parents": [], "rootCommit": true},
            "C1'^4294967295": {"id": "C1'^4294967295", "parents": ["C0"]}
          },
          "HEAD": {"id": "HEAD", "target": "master"}
        }"#,
    )
    .unwrap();
    let mut e = Engine::from_tree(&tree, EngineConfig::default()).unwrap();
    let before = e.export_tree();

    let err = e
        .execute(&CommandRequest::git("commit").with_option("--amend", Vec::<String>::new()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(e.export_tree(), before);

    exec(&mut e, CommandRequest::git("checkout").with_args(["C0"]));
    let before = e.export_tree();
    let err = e
        .execute(&CommandRequest::git("cherry-pick").with_args(["C1'^4294967295"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(e.export_tree(), before);
}

#[test]
fn commit_with_all_flag_warns() {
    let mut e = engine();
    let outcome = exec(&mut e, CommandRequest::git("commit").with_option("-a", Vec::<String>::new()));
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn am_flag_cannot_be_combined() {
    let mut e = engine();
    let err = e
        .execute(
            &CommandRequest::git("commit")
                .with_option("-am", ["msg"])
                .with_option("-m", ["other"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn checkout_dash_returns_to_previous_target() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["side"]));
    assert_eq!(e.repository().local.head_branch(), Some("side"));
    exec(&mut e, CommandRequest::git("checkout").with_option("-", Vec::<String>::new()));
    assert_eq!(e.repository().local.head_branch(), Some("master"));
}

#[test]
fn checkout_of_relative_ref_detaches() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_args(["HEAD^"]));
    assert_eq!(
        e.repository().local.head().target,
        HeadTarget::Commit(id("C0"))
    );
    let outcome = exec(&mut e, CommandRequest::git("commit"));
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn switch_create_uses_dash_c() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("switch").with_option("-c", ["feat", "C0"]));
    assert_eq!(e.repository().local.head_branch(), Some("feat"));
    assert_eq!(target_of(&e, "feat"), id("C0"));
}

// =============================================================================
// Branches and tags
// =============================================================================

#[test]
fn main_is_an_alias_for_master() {
    let mut e = engine();
    let err = e
        .execute(&CommandRequest::git("branch").with_args(["main"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    exec(&mut e, CommandRequest::git("checkout").with_args(["main"]));
    assert_eq!(e.repository().local.head_branch(), Some("master"));
}

#[test]
fn reserved_branch_names_are_rejected() {
    let mut e = engine();
    for name in ["HEAD", "head", "C7", "o/side"] {
        let err = e
            .execute(&CommandRequest::git("branch").with_args([name]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{name}");
    }
}

#[test]
fn force_branch_moves_existing_branch() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("branch").with_option("-f", ["bugFix", "C0"]));
    assert_eq!(target_of(&e, "bugFix"), id("C0"));
}

#[test]
fn branch_listing_marks_current() {
    let mut e = diverged();
    let outcome = exec(&mut e, CommandRequest::git("branch"));
    assert_eq!(outcome.message.as_deref(), Some("bugFix\n* master"));
}

#[test]
fn deleting_branches_checks_state() {
    let mut e = diverged();
    let err = e
        .execute(&CommandRequest::git("branch").with_option("-d", ["master"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    exec(&mut e, CommandRequest::git("branch").with_option("-D", ["bugFix"]));
    assert!(e.repository().local.branch("bugFix").is_none());
}

#[test]
fn tags_describe_and_delete() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("tag").with_args(["v1", "C1"]));
    let outcome = exec(&mut e, CommandRequest::git("describe"));
    assert_eq!(outcome.message.as_deref(), Some("v1_1_gC3"));
    exec(&mut e, CommandRequest::git("tag").with_option("-d", ["v1"]));
    let err = e
        .execute(&CommandRequest::git("tag").with_option("-d", ["v1"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

// =============================================================================
// Merge, rebase, cherry-pick, revert, reset
// =============================================================================

#[test]
fn merge_creates_two_parent_commit() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("merge").with_args(["bugFix"]));
    assert_eq!(target_of(&e, "master"), id("C4"));
    assert_eq!(parents(&e, "C4"), vec![id("C3"), id("C2")]);
    let message = &e.repository().local.commit(&id("C4")).unwrap().meta.message;
    assert_eq!(message, "Merge bugFix into master");
}

#[test]
fn merge_of_ancestor_is_noop() {
    let mut e = diverged();
    let outcome = exec(&mut e, CommandRequest::git("merge").with_args(["C1"]));
    assert_eq!(outcome.status, Status::NoOp);
    assert!(outcome.changes.is_empty());
}

#[test]
fn merge_fast_forwards_unless_told_not_to() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("checkout").with_args(["C1"]));
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["late"]));
    exec(&mut e, CommandRequest::git("merge").with_args(["bugFix"]));
    assert_eq!(target_of(&e, "late"), id("C2"));

    exec(&mut e, CommandRequest::git("branch").with_option("-f", ["late", "C1"]));
    exec(
        &mut e,
        CommandRequest::git("merge")
            .with_args(["bugFix"])
            .with_option("--no-ff", Vec::<String>::new()),
    );
    assert_eq!(parents(&e, "C4"), vec![id("C1"), id("C2")]);
}

#[test]
fn rebase_onto_ancestor_is_noop() {
    let mut e = diverged();
    let outcome = exec(&mut e, CommandRequest::git("rebase").with_args(["C0"]));
    assert_eq!(outcome.status, Status::NoOp);
}

#[test]
fn rebase_then_fast_forward() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("checkout").with_args(["bugFix"]));
    exec(&mut e, CommandRequest::git("rebase").with_args(["master"]));
    assert_eq!(target_of(&e, "bugFix"), id("C2'"));
    assert_eq!(parents(&e, "C2'"), vec![id("C3")]);

    exec(&mut e, CommandRequest::git("rebase").with_args(["bugFix", "master"]));
    assert_eq!(target_of(&e, "master"), id("C2'"));
    assert_eq!(e.repository().local.head_branch(), Some("master"));
}

#[test]
fn interactive_rebase_pauses_with_plan() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("commit"));
    let outcome = exec(&mut e, CommandRequest::git("rebase").with_option("-i", ["HEAD~3"]));
    assert_eq!(outcome.status, Status::Paused);
    let plan = outcome.plan.unwrap();
    assert_eq!(plan.candidates, vec![id("C1"), id("C2"), id("C3")]);
    assert!(outcome.changes.is_empty());

    let applied = e.apply_rebase(&plan, &[id("C3"), id("C1")]).unwrap();
    assert_eq!(applied.status, Status::Success);
    assert_eq!(target_of(&e, "master"), id("C1'"));
    assert_eq!(parents(&e, "C1'"), vec![id("C3'")]);
    assert_eq!(parents(&e, "C3'"), vec![id("C0")]);
}

#[test]
fn interactive_test_option_applies_ordering_directly() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("commit"));
    exec(
        &mut e,
        CommandRequest::git("rebase")
            .with_option("-i", ["HEAD~2"])
            .with_option("--interactive-test", ["C2"]),
    );
    assert_eq!(target_of(&e, "master"), id("C2'"));
    assert_eq!(parents(&e, "C2'"), vec![id("C0")]);

    let err = e
        .execute(
            &CommandRequest::git("rebase")
                .with_option("-i", ["HEAD~1"])
                .with_option("--interactive-test", ["C9"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn cherry_pick_copies_onto_head() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("cherry-pick").with_args(["C2"]));
    assert_eq!(target_of(&e, "master"), id("C2'"));
    assert_eq!(parents(&e, "C2'"), vec![id("C3")]);
}

#[test]
fn revert_stacks_reverting_commits() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::git("revert").with_args(["C3"]));
    assert_eq!(target_of(&e, "master"), id("C3'"));
    let message = &e.repository().local.commit(&id("C3'")).unwrap().meta.message;
    assert!(message.starts_with("Reverting C3"));
}

#[test]
fn reset_moves_branch_and_soft_is_rejected() {
    let mut e = diverged();
    let outcome = exec(&mut e, CommandRequest::git("reset").with_option("--hard", ["HEAD~1"]));
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(target_of(&e, "master"), id("C1"));
    let err = e
        .execute(&CommandRequest::git("reset").with_option("--soft", ["C0"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn log_and_rev_list_walk_newest_first() {
    let mut e = diverged();
    let outcome = exec(&mut e, CommandRequest::git("rev-list").with_args(["master", "^bugFix"]));
    assert_eq!(outcome.message.as_deref(), Some("C3"));
    let outcome = exec(&mut e, CommandRequest::git("log"));
    let text = outcome.message.unwrap();
    assert!(text.find("Commit: C3").unwrap() < text.find("Commit: C0").unwrap());
}

#[test]
fn add_is_a_noop() {
    let mut e = engine();
    let outcome = exec(&mut e, CommandRequest::git("add"));
    assert_eq!(outcome.status, Status::NoOp);
}

// =============================================================================
// Atomicity
// =============================================================================

#[test]
fn failed_commands_leave_tree_unchanged() {
    let mut e = diverged();
    let before = e.export_tree();
    for request in [
        CommandRequest::git("merge").with_args(["nothere"]),
        CommandRequest::git("cherry-pick").with_args(["C2", "C1"]),
        CommandRequest::git("checkout").with_args(["a", "b"]),
        CommandRequest::git("frobnicate"),
        CommandRequest::git("push"),
    ] {
        assert!(e.execute(&request).is_err(), "{request:?}");
        assert_eq!(e.export_tree(), before);
    }
}

// =============================================================================
// hg dialect
// =============================================================================

#[test]
fn hg_rebase_moves_bookmarks_and_prunes() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["feature"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("checkout").with_args(["master"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("checkout").with_args(["feature"]));

    let outcome = exec(&mut e, CommandRequest::hg("rebase").with_option("-d", ["master"]));
    assert_eq!(e.mode(), Dialect::Hg);
    assert_eq!(target_of(&e, "feature"), id("C3'"));
    assert_eq!(parents(&e, "C2'"), vec![id("C4")]);
    let local = &e.repository().local;
    assert!(local.commit(&id("C2")).is_none());
    assert!(local.commit(&id("C3")).is_none());
    assert!(outcome.warnings.iter().any(|w| w.contains("Pruned 2")));
}

#[test]
fn first_hg_command_follows_rewrites() {
    let mut e = engine();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["side"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("checkout").with_args(["master"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("cherry-pick").with_args(["C2"]));

    let outcome = exec(&mut e, CommandRequest::hg("summary"));
    assert_eq!(target_of(&e, "side"), id("C2'"));
    assert!(e.repository().local.commit(&id("C2")).is_none());
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.message.as_deref(), Some("* master\nside"));
}

#[test]
fn hg_bookmark_forms_map_to_branch_commands() {
    let mut e = engine();
    exec(&mut e, CommandRequest::hg("bookmark").with_args(["feat"]));
    assert_eq!(e.repository().local.head_branch(), Some("feat"));

    exec(&mut e, CommandRequest::hg("bookmark").with_args(["old"]).with_option("-r", ["C0"]));
    assert_eq!(target_of(&e, "old"), id("C0"));

    exec(&mut e, CommandRequest::hg("bookmark").with_option("-d", ["old"]));
    assert!(e.repository().local.branch("old").is_none());

    let err = e
        .execute(
            &CommandRequest::hg("bookmark")
                .with_option("-d", ["feat"])
                .with_option("-r", ["C0"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn hg_commit_warns_about_addremove() {
    let mut e = engine();
    let outcome = exec(&mut e, CommandRequest::hg("ci").with_option("-A", Vec::<String>::new()));
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(target_of(&e, "master"), id("C2"));
}

#[test]
fn hg_status_and_bare_log_are_errors() {
    let mut e = engine();
    assert!(e.execute(&CommandRequest::hg("status")).is_err());
    assert!(e.execute(&CommandRequest::hg("log")).is_err());
    let outcome = exec(&mut e, CommandRequest::hg("log").with_option("-f", ["."]));
    assert!(outcome.message.unwrap().contains("Commit: C1"));
}

#[test]
fn hg_update_and_graft() {
    let mut e = diverged();
    exec(&mut e, CommandRequest::hg("update").with_option("-r", ["bugFix"]));
    assert_eq!(e.repository().local.head_branch(), Some("bugFix"));
    exec(&mut e, CommandRequest::hg("graft").with_option("-r", ["C3"]));
    assert_eq!(target_of(&e, "bugFix"), id("C3'"));
}

#[test]
fn git_command_returns_to_git_mode() {
    let mut e = engine();
    exec(&mut e, CommandRequest::hg("summary"));
    assert_eq!(e.mode(), Dialect::Hg);
    exec(&mut e, CommandRequest::git("status"));
    assert_eq!(e.mode(), Dialect::Git);
}
