//! ui::messages
//!
//! Rendering of advisories and command results.
//!
//! # Design
//!
//! The engine never formats user-facing text itself. It produces [`Notice`]
//! values and asks a [`Messages`] provider to render them, so a caller can
//! swap the wording without touching any engine logic. Nothing in the engine
//! inspects rendered text.

use crate::core::types::CommitId;

/// An advisory or result the engine wants to tell the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Nothing to merge, fetch or push.
    UpToDate,
    /// A branch pointer moved forward without a new commit.
    FastForward { branch: String },
    /// A rebase found nothing to replay.
    NothingToRebase,
    /// A command had nothing to act on.
    NothingToDo,
    /// A commit was made while HEAD is detached.
    DetachedCommit,
    /// `commit -a` was given, which this model does not need.
    AddNotNeeded,
    /// `add` and `reset --soft` touch the index, which is not modeled.
    StagingUnsupported,
    /// `reset --hard` behaves like a plain reset.
    HardIsDefault,
    /// `hg commit -A` was given, which this model does not need.
    HgAddRemoveNotNeeded,
    /// Unreachable commits were removed.
    PrunedCommits { count: usize },
    /// A branch or tag name was shortened.
    NameTruncated { from: String, to: String },
    /// A local branch now follows a remote-tracking branch.
    TrackingSet { local: String, remote: String },
    /// Message for a merge commit.
    MergeMessage { source: String, target: String },
    /// Message for a revert commit.
    RevertMessage { commit: CommitId, message: String },
    /// A commit created on origin by simulated teamwork.
    TeamworkMessage { branch: String },
}

/// Renders notices into text.
pub trait Messages {
    fn render(&self, notice: &Notice) -> String;
}

/// English wording.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl Messages for DefaultMessages {
    fn render(&self, notice: &Notice) -> String {
        match notice {
            Notice::UpToDate => "Branch already up-to-date".to_string(),
            Notice::FastForward { branch } => format!("Fast forwarding {branch}..."),
            Notice::NothingToRebase => {
                "No commits to rebase! Everything is a merge commit or changes already applied"
                    .to_string()
            }
            Notice::NothingToDo => "There's nothing to do...".to_string(),
            Notice::DetachedCommit => {
                "Warning!! Detached HEAD state; this commit is not on any branch".to_string()
            }
            Notice::AddNotNeeded => "No need to add files in this demo".to_string(),
            Notice::StagingUnsupported => {
                "There is no concept of adding / staging files, so that option or command is invalid!"
                    .to_string()
            }
            Notice::HardIsDefault => {
                "The default behavior is a --hard reset, feel free to omit that option!".to_string()
            }
            Notice::HgAddRemoveNotNeeded => {
                "The -A option is not needed for this app, just commit away!".to_string()
            }
            Notice::PrunedCommits { count } => {
                format!("Pruned {count} unreachable commit(s) for mercurial compatibility")
            }
            Notice::NameTruncated { from, to } => {
                format!("Sorry, we need to keep branch names short; {from} was truncated to {to}")
            }
            Notice::TrackingSet { local, remote } => {
                format!("local branch \"{local}\" set to track remote branch \"{remote}\"")
            }
            Notice::MergeMessage { source, target } => format!("Merge {source} into {target}"),
            Notice::RevertMessage { commit, message } => {
                format!("Reverting {commit}: \"{message}\"")
            }
            Notice::TeamworkMessage { branch } => {
                format!("Someone else pushed this to {branch}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_message_names_both_sides() {
        let text = DefaultMessages.render(&Notice::MergeMessage {
            source: "bugFix".into(),
            target: "master".into(),
        });
        assert_eq!(text, "Merge bugFix into master");
    }

    #[test]
    fn revert_message_quotes_the_original() {
        let text = DefaultMessages.render(&Notice::RevertMessage {
            commit: CommitId::new(3),
            message: "add feature".into(),
        });
        insta::assert_snapshot!(text, @r#"Reverting C3: "add feature""#);
    }

    #[test]
    fn a_custom_provider_replaces_wording() {
        struct Terse;
        impl Messages for Terse {
            fn render(&self, _: &Notice) -> String {
                "!".into()
            }
        }
        assert_eq!(Terse.render(&Notice::UpToDate), "!");
    }
}
