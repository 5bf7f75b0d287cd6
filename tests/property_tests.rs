//! Property-based tests for graph invariants.
//!
//! These tests use proptest to drive the engine with random command
//! sequences and check that the invariants hold after every step.

use proptest::prelude::*;

use gitsim::core::types::{alias_trunk, validate_branch_name};
use gitsim::core::verify::fast_verify;
use gitsim::engine::{CommandRequest, Engine, EngineConfig};
use gitsim::tree::default_tree;

/// Strategy for ref specs the commands below refer to.
fn ref_spec() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("master".to_string()),
        Just("side".to_string()),
        Just("feat".to_string()),
        Just("HEAD".to_string()),
        Just("HEAD^".to_string()),
        Just("HEAD~2".to_string()),
        Just("o/master".to_string()),
        (0u64..8).prop_map(|n| format!("C{n}")),
        (0u64..8).prop_map(|n| format!("C{n}'")),
    ]
}

/// Strategy for one git request. Many of these fail; that is part of the
/// point.
fn git_request() -> impl Strategy<Value = CommandRequest> {
    prop_oneof![
        4 => Just(CommandRequest::git("commit")),
        1 => Just(CommandRequest::git("commit").with_option("--amend", Vec::<String>::new())),
        3 => ref_spec().prop_map(|r| CommandRequest::git("checkout").with_args([r])),
        1 => (prop::sample::select(vec!["side", "feat"]), ref_spec())
            .prop_map(|(b, r)| CommandRequest::git("branch").with_args([b.to_string(), r])),
        1 => (prop::sample::select(vec!["side", "feat"]), ref_spec()).prop_map(|(b, r)| {
            CommandRequest::git("branch").with_option("-f", [b.to_string(), r])
        }),
        2 => ref_spec().prop_map(|r| CommandRequest::git("merge").with_args([r])),
        2 => ref_spec().prop_map(|r| CommandRequest::git("rebase").with_args([r])),
        1 => ref_spec().prop_map(|r| CommandRequest::git("cherry-pick").with_args([r])),
        1 => ref_spec().prop_map(|r| CommandRequest::git("revert").with_args([r])),
        1 => ref_spec().prop_map(|r| CommandRequest::git("reset").with_args([r])),
        1 => Just(CommandRequest::git("clone")),
        1 => Just(CommandRequest::git("fakeTeamwork")),
        1 => Just(CommandRequest::git("fetch")),
        1 => Just(CommandRequest::git("pull")),
        1 => Just(CommandRequest::git("push")),
        1 => ref_spec().prop_map(|r| CommandRequest::hg("rebase").with_option("-d", [r])),
        1 => Just(CommandRequest::hg("summary")),
    ]
}

fn script() -> impl Strategy<Value = Vec<CommandRequest>> {
    prop::collection::vec(git_request(), 1..25)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every command either succeeds with a consistent graph or fails
    /// without changing anything.
    #[test]
    fn commands_keep_graphs_consistent(requests in script()) {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        for request in &requests {
            let before = engine.export_tree();
            match engine.execute(request) {
                Ok(_) => {
                    let repo = engine.repository();
                    let local = fast_verify(&repo.local);
                    prop_assert!(local.ok, "{:?} broke local: {:?}", request, local.errors);
                    if let Some(origin) = &repo.origin {
                        let origin = fast_verify(origin);
                        prop_assert!(origin.ok, "{:?} broke origin: {:?}", request, origin.errors);
                    }
                }
                Err(_) => prop_assert_eq!(engine.export_tree(), before),
            }
        }
    }

    /// Validated names are never longer than the limit and are prefixes of
    /// the input.
    #[test]
    fn validated_names_are_bounded_prefixes(
        name in "[a-z][a-z0-9_]{1,20}",
        max_len in 2usize..12,
    ) {
        if let Ok(valid) = validate_branch_name(&name, max_len) {
            prop_assert!(valid.name.chars().count() <= max_len);
            prop_assert!(name.starts_with(&valid.name));
            prop_assert_eq!(valid.truncated_from.is_some(), name.len() > max_len);
        }
    }

    /// Trunk aliasing only ever touches whole `main` segments.
    #[test]
    fn trunk_alias_is_idempotent(name in "[a-z/_-]{0,16}") {
        let once = alias_trunk(&name);
        prop_assert_eq!(alias_trunk(&once), once.clone());
        if !name.contains("main") {
            prop_assert_eq!(once, name);
        }
    }
}

#[test]
fn default_tree_is_consistent() {
    let graph = gitsim::tree::build_graph(&default_tree(), false).unwrap();
    assert!(fast_verify(&graph).ok);
}
