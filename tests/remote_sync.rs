//! Integration tests for origin commands: clone, fetch, push, pull and
//! simulated teamwork.

use gitsim::core::graph::{HeadTarget, Mutation};
use gitsim::core::repo::{Change, Side};
use gitsim::core::types::CommitId;
use gitsim::engine::{CommandRequest, Engine, EngineConfig, ErrorKind, Outcome, Status};
use gitsim::tree::TreeSnapshot;

fn id(s: &str) -> CommitId {
    s.parse().unwrap()
}

fn exec(engine: &mut Engine, request: CommandRequest) -> Outcome {
    engine
        .execute(&request)
        .unwrap_or_else(|err| panic!("{request:?} failed: {err}"))
}

fn cloned() -> Engine {
    let mut e = Engine::new(EngineConfig::default()).unwrap();
    exec(&mut e, CommandRequest::git("clone"));
    e
}

fn local_target(engine: &Engine, branch: &str) -> CommitId {
    engine.repository().local.branch(branch).unwrap().target
}

/// Commits created on `side`, in the order they were made.
fn created_on(changes: &[Change], side: Side) -> Vec<(CommitId, Vec<CommitId>)> {
    changes
        .iter()
        .filter(|c| c.side == side)
        .filter_map(|c| match &c.mutation {
            Mutation::CommitCreated { id, parents } => Some((*id, parents.clone())),
            _ => None,
        })
        .collect()
}

/// Ref mutations on `side` touching `name`.
fn ref_changes<'a>(changes: &'a [Change], side: Side, name: &str) -> Vec<&'a Mutation> {
    changes
        .iter()
        .filter(|c| c.side == side)
        .map(|c| &c.mutation)
        .filter(|m| match m {
            Mutation::RefCreated { name: n, .. } | Mutation::RefMoved { name: n, .. } => n == name,
            _ => false,
        })
        .collect()
}

fn origin_target(engine: &Engine, branch: &str) -> CommitId {
    engine
        .repository()
        .origin
        .as_ref()
        .unwrap()
        .branch(branch)
        .unwrap()
        .target
}

#[test]
fn clone_mirrors_branches_and_sets_tracking() {
    let mut e = Engine::new(EngineConfig::default()).unwrap();
    let outcome = exec(&mut e, CommandRequest::git("clone"));
    assert_eq!(outcome.warnings.len(), 1);

    assert_eq!(origin_target(&e, "master"), id("C1"));
    assert_eq!(local_target(&e, "o/master"), id("C1"));
    let master = e.repository().local.branch("master").unwrap();
    assert_eq!(master.remote_tracking.as_deref(), Some("o/master"));
}

#[test]
fn second_clone_is_rejected() {
    let mut e = cloned();
    let err = e.execute(&CommandRequest::git("clone")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn origin_commands_need_an_origin() {
    let mut e = Engine::new(EngineConfig::default()).unwrap();
    for method in ["fetch", "push", "pull", "fakeTeamwork"] {
        let err = e.execute(&CommandRequest::git(method)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State, "{method}");
    }
    let outcome = exec(&mut e, CommandRequest::git("remote"));
    assert_eq!(outcome.status, Status::NoOp);
    assert_eq!(outcome.message.as_deref(), Some(""));
}

#[test]
fn remote_lists_origin_once_cloned() {
    let mut e = cloned();
    let outcome = exec(&mut e, CommandRequest::git("remote"));
    assert_eq!(outcome.message.as_deref(), Some("origin"));
    let outcome = exec(&mut e, CommandRequest::git("remote").with_option("-v", Vec::<String>::new()));
    assert!(outcome.message.unwrap().contains("origin (push)"));
}

#[test]
fn fetch_downloads_teamwork_without_touching_local_branches() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    assert_eq!(origin_target(&e, "master"), id("C2"));
    assert!(!e.repository().local.contains_commit(&id("C2")));

    exec(&mut e, CommandRequest::git("fetch"));
    assert_eq!(local_target(&e, "o/master"), id("C2"));
    assert_eq!(local_target(&e, "master"), id("C1"));

    let outcome = exec(&mut e, CommandRequest::git("fetch"));
    assert_eq!(outcome.status, Status::NoOp);
}

#[test]
fn fake_teamwork_counts_and_rejects_bad_numbers() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork").with_args(["master", "3"]));
    assert_eq!(origin_target(&e, "master"), id("C4"));

    let err = e
        .execute(&CommandRequest::git("fakeTeamwork").with_args(["master", "lots"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("Bad numeric argument: lots"));
}

#[test]
fn pull_fast_forwards_behind_branch() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    exec(&mut e, CommandRequest::git("pull"));
    assert_eq!(local_target(&e, "master"), id("C2"));
    assert_eq!(local_target(&e, "o/master"), id("C2"));
    assert_eq!(e.repository().local.head_branch(), Some("master"));
}

#[test]
fn pull_merges_diverged_branch() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("pull"));

    assert_eq!(local_target(&e, "master"), id("C4"));
    let local = &e.repository().local;
    assert_eq!(local.parents_of(&id("C4")), &[id("C3"), id("C2")]);
}

#[test]
fn pull_when_current_is_noop() {
    let mut e = cloned();
    let outcome = exec(&mut e, CommandRequest::git("pull"));
    assert_eq!(outcome.status, Status::NoOp);
}

#[test]
fn push_uploads_local_commits() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("push"));

    assert_eq!(origin_target(&e, "master"), id("C2"));
    assert_eq!(local_target(&e, "o/master"), id("C2"));

    let outcome = exec(&mut e, CommandRequest::git("push"));
    assert_eq!(outcome.status, Status::NoOp);
}

#[test]
fn diverged_push_is_rejected_until_pull_rebase() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    exec(&mut e, CommandRequest::git("commit"));

    let before = e.export_tree();
    let err = e.execute(&CommandRequest::git("push")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(e.export_tree(), before);

    exec(
        &mut e,
        CommandRequest::git("pull").with_option("--rebase", Vec::<String>::new()),
    );
    assert_eq!(local_target(&e, "master"), id("C3'"));
    assert_eq!(e.repository().local.parents_of(&id("C3'")), &[id("C2")]);

    exec(&mut e, CommandRequest::git("push"));
    assert_eq!(origin_target(&e, "master"), id("C3'"));
}

#[test]
fn force_push_overwrites_origin_branch() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("push").with_option("--force", Vec::<String>::new()));
    assert_eq!(origin_target(&e, "master"), id("C3"));
    assert_eq!(local_target(&e, "o/master"), id("C3"));
}

#[test]
fn pushing_new_branch_creates_and_tracks_it() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["feat"]));
    exec(&mut e, CommandRequest::git("commit"));
    let outcome = exec(&mut e, CommandRequest::git("push"));
    assert_eq!(outcome.warnings.len(), 1);

    assert_eq!(origin_target(&e, "feat"), id("C2"));
    assert_eq!(local_target(&e, "o/feat"), id("C2"));
    let feat = e.repository().local.branch("feat").unwrap();
    assert_eq!(feat.remote_tracking.as_deref(), Some("o/feat"));
}

#[test]
fn delete_push_removes_remote_branch() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["feat"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("push"));
    exec(&mut e, CommandRequest::git("push").with_args(["origin", ":feat"]));

    let origin = e.repository().origin.as_ref().unwrap();
    assert!(origin.branch("feat").is_none());
    assert!(!origin.contains_commit(&id("C2")));
    assert!(e.repository().local.branch("o/feat").is_none());

    let err = e
        .execute(&CommandRequest::git("push").with_args(["origin", ":master"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn fetch_refspec_into_checked_out_branch_fails() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    let err = e
        .execute(&CommandRequest::git("fetch").with_args(["origin", "master:master"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn unknown_remote_name_is_rejected() {
    let mut e = cloned();
    let err = e
        .execute(&CommandRequest::git("fetch").with_args(["upstream"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn remote_tracking_branches_check_out_detached() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("checkout").with_args(["o/master"]));
    assert_eq!(
        e.repository().local.head().target,
        HeadTarget::Commit(id("C1"))
    );
}

#[test]
fn saved_tree_with_origin_reloads() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    let saved = e.export_tree();
    assert!(saved.origin_tree.is_some());

    let reloaded = Engine::from_tree(&saved, EngineConfig::default()).unwrap();
    assert_eq!(reloaded.export_tree(), saved);
    assert_eq!(origin_target(&reloaded, "master"), id("C2"));
}

#[test]
fn pushing_a_merged_branch_replays_parents_first() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("fakeTeamwork"));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("pull"));
    assert_eq!(
        e.repository().local.parents_of(&id("C4")),
        [id("C3"), id("C2")]
    );

    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["f2", "C3"]));
    exec(&mut e, CommandRequest::git("commit"));
    exec(&mut e, CommandRequest::git("merge").with_args(["master"]));
    let outcome = exec(&mut e, CommandRequest::git("push"));

    assert_eq!(
        created_on(&outcome.changes, Side::Origin),
        vec![
            (id("C3"), vec![id("C1")]),
            (id("C4"), vec![id("C3"), id("C2")]),
            (id("C5"), vec![id("C3")]),
            (id("C6"), vec![id("C5"), id("C4")]),
        ]
    );
    assert_eq!(
        ref_changes(&outcome.changes, Side::Origin, "f2"),
        vec![
            &Mutation::RefCreated {
                name: "f2".into(),
                target: "C1".into()
            },
            &Mutation::RefMoved {
                name: "f2".into(),
                from: "C1".into(),
                to: "C6".into()
            },
        ]
    );
    assert_eq!(origin_target(&e, "f2"), id("C6"));
    assert_eq!(local_target(&e, "o/f2"), id("C6"));
}

#[test]
fn fetch_across_a_merge_skips_commits_already_present() {
    let tree = TreeSnapshot::from_json(
        r#"{
          "branches": {
            "master": {"id": "master", "target": "C1"},
            "keep": {"id": "keep", "target": "C4"}
          },
          "commits": {
            "C0": {"id": "C0", "parents": [], "rootCommit": true},
            "C1": {"id": "C1", "parents": ["C0"]},
            "C4": {"id": "C4", "parents": ["C1"]}
          },
          "HEAD": {"id": "HEAD", "target": "master"},
          "originTree": {
            "branches": {
              "master": {"id": "master", "target": "C1"},
              "side": {"id": "side", "target": "C5"}
            },
            "commits": {
              "C0": {"id": "C0", "parents": [], "rootCommit": true},
              "C1": {"id": "C1", "parents": ["C0"]},
              "C3": {"id": "C3", "parents": ["C1"]},
              "C4": {"id": "C4", "parents": ["C1"]},
              "C5": {"id": "C5", "parents": ["C3", "C4"]}
            },
            "HEAD": {"id": "HEAD", "target": "master"}
          }
        }"#,
    )
    .unwrap();
    let mut e = Engine::from_tree(&tree, EngineConfig::default()).unwrap();
    // Both merge parents resolve separately; their meeting point is C1.
    assert_eq!(local_target(&e, "o/side"), id("C1"));

    let outcome = exec(&mut e, CommandRequest::git("fetch"));
    assert_eq!(
        created_on(&outcome.changes, Side::Local),
        vec![(id("C3"), vec![id("C1")]), (id("C5"), vec![id("C3"), id("C4")])]
    );
    assert_eq!(local_target(&e, "o/side"), id("C5"));
    assert_eq!(local_target(&e, "keep"), id("C4"));
}

#[test]
fn pushing_a_long_merge_ladder_stays_fast() {
    let mut e = cloned();
    exec(&mut e, CommandRequest::git("checkout").with_option("-b", ["feat"]));
    exec(&mut e, CommandRequest::git("branch").with_args(["side"]));
    for _ in 0..32 {
        exec(&mut e, CommandRequest::git("checkout").with_args(["side"]));
        exec(&mut e, CommandRequest::git("commit"));
        exec(&mut e, CommandRequest::git("checkout").with_args(["feat"]));
        exec(&mut e, CommandRequest::git("commit"));
        exec(&mut e, CommandRequest::git("merge").with_args(["side"]));
        exec(&mut e, CommandRequest::git("branch").with_option("-f", ["side", "feat"]));
    }

    let outcome = exec(&mut e, CommandRequest::git("push"));
    assert_eq!(created_on(&outcome.changes, Side::Origin).len(), 96);
    assert_eq!(
        ref_changes(&outcome.changes, Side::Origin, "feat")[0],
        &Mutation::RefCreated {
            name: "feat".into(),
            target: "C1".into()
        }
    );
    assert_eq!(origin_target(&e, "feat"), local_target(&e, "feat"));
}
