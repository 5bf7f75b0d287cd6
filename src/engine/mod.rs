//! engine
//!
//! Executes structured commands against a repository.
//!
//! # Architecture
//!
//! The engine owns a [`Repository`] and runs each [`CommandRequest`] through
//! a fixed lifecycle:
//!
//! ```text
//! Parse -> Validate options -> [Enter hg mode] -> Run -> Verify -> Report
//! ```
//!
//! Methods are parsed into closed enums and their options checked before
//! any work starts. The dialect modules translate arguments into
//! session operations; the hg dialect rewrites its commands into
//! git ones.
//!
//! # Invariants
//!
//! - A failed command leaves the repository exactly as it found it
//! - With verification on, a command that breaks a graph invariant is
//!   undone and reported as [`CommandError::Corrupted`]
//! - Every change a command made is reported in its [`Outcome`]
//!
//! # Example
//!
//! ```
//! use gitsim::engine::{Engine, EngineConfig, Status};
//! use gitsim::engine::command::CommandRequest;
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let outcome = engine.execute(&CommandRequest::git("commit")).unwrap();
//! assert_eq!(outcome.status, Status::Success);
//! assert_eq!(engine.repository().local.head_commit().unwrap().to_string(), "C2");
//! ```

pub mod command;
pub mod error;
mod git;
mod hg;
pub mod ops;
pub mod rebase;

pub use command::{CommandRequest, Dialect};
pub use error::{CommandError, ErrorKind, LoadError};
pub use rebase::{RebasePlan, RebaseResult};

use crate::core::config::{Config, DEFAULT_AUTHOR, DEFAULT_MAX_BRANCH_NAME_LEN};
use crate::core::repo::{Change, Repository};
use crate::core::types::CommitId;
use crate::core::verify::fast_verify;
use crate::remote::{self, OriginSeed, TrackingLink};
use crate::tree::serialize::{build_graph, default_tree, export_repository};
use crate::tree::{TreeError, TreeSnapshot};
use crate::ui::messages::{DefaultMessages, Messages};
use command::{Args, GitMethod, HgMethod};
use ops::Session;
use serde::Serialize;
use tracing::{debug, warn};

/// Settings the engine reads while running commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_branch_name_len: usize,
    pub author: String,
    pub detached_warning: bool,
    pub verify: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_branch_name_len: DEFAULT_MAX_BRANCH_NAME_LEN,
            author: DEFAULT_AUTHOR.to_string(),
            detached_warning: true,
            verify: true,
        }
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_branch_name_len: config.max_branch_name_len(),
            author: config.author().to_string(),
            detached_warning: config.detached_commit_warning(),
            verify: config.verify_after_command(),
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The command did what it was asked.
    Success,
    /// The command was valid but had nothing to do.
    NoOp,
    /// An interactive rebase is waiting for an ordering.
    Paused,
}

/// Everything a command reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub warnings: Vec<String>,
    pub changes: Vec<Change>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<RebasePlan>,
}

/// A repository plus the settings and wording used to drive it.
pub struct Engine {
    repo: Repository,
    settings: EngineConfig,
    mode: Dialect,
    messages: Box<dyn Messages>,
}

impl Engine {
    /// An engine over the default two-commit tree.
    pub fn new(settings: EngineConfig) -> Result<Self, LoadError> {
        Self::from_tree(&default_tree(), settings)
    }

    /// An engine over a saved tree. A nested `originTree` becomes the origin.
    pub fn from_tree(tree: &TreeSnapshot, settings: EngineConfig) -> Result<Self, LoadError> {
        let mut repo = Repository::new(build_graph(tree, false)?);
        if let Some(origin_tree) = tree.origin_tree.as_deref() {
            let origin = build_graph(origin_tree, true)?;
            remote::attach_origin(&mut repo, origin)?;
        }
        repo.take_changes();
        Ok(Self {
            repo,
            settings,
            mode: Dialect::Git,
            messages: Box::new(DefaultMessages),
        })
    }

    /// Replace the wording provider.
    pub fn with_messages(mut self, messages: Box<dyn Messages>) -> Self {
        self.messages = messages;
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The dialect of the last successful command.
    pub fn mode(&self) -> Dialect {
        self.mode
    }

    /// The current state as a tree, origin nested.
    pub fn export_tree(&self) -> TreeSnapshot {
        export_repository(&self.repo)
    }

    /// The current state as compact tree JSON.
    pub fn tree_string(&self) -> Result<String, TreeError> {
        self.export_tree().to_json()
    }

    /// Run one command.
    ///
    /// On error the repository is left untouched.
    pub fn execute(&mut self, request: &CommandRequest) -> Result<Outcome, CommandError> {
        let method = request.method.clone();
        self.transaction(&method, |engine| engine.dispatch(request))
    }

    /// First phase of an interactive rebase of `branch` onto `target`.
    pub fn plan_interactive_rebase(
        &mut self,
        target: &str,
        branch: &str,
    ) -> Result<RebasePlan, CommandError> {
        let session = Session::new(
            &mut self.repo,
            &self.settings,
            self.messages.as_ref(),
            self.mode,
        );
        session.plan_interactive(target, branch, None, false)
    }

    /// Second phase of an interactive rebase: replay `order`.
    pub fn apply_rebase(
        &mut self,
        plan: &RebasePlan,
        order: &[CommitId],
    ) -> Result<Outcome, CommandError> {
        self.transaction("rebase", |engine| {
            let mut session = Session::new(
                &mut engine.repo,
                &engine.settings,
                engine.messages.as_ref(),
                engine.mode,
            );
            session.apply_plan(plan, order)?;
            Ok(report(session))
        })
    }

    /// Create an origin from the local graph.
    pub fn make_origin(&mut self, seed: OriginSeed) -> Result<Vec<TrackingLink>, CommandError> {
        let snapshot = self.repo.clone();
        match remote::make_origin(&mut self.repo, seed) {
            Ok(links) => {
                self.repo.take_changes();
                Ok(links)
            }
            Err(err) => {
                self.repo = snapshot;
                Err(err.into())
            }
        }
    }

    fn dispatch(&mut self, request: &CommandRequest) -> Result<Partial, CommandError> {
        let mut session = Session::new(
            &mut self.repo,
            &self.settings,
            self.messages.as_ref(),
            request.dialect,
        );
        match request.dialect {
            Dialect::Git => {
                let method = GitMethod::parse(&request.method)?;
                let args = Args::new(
                    method.name(),
                    request.general_args.clone(),
                    request.options.clone(),
                    method.options(),
                )?;
                git::run(&mut session, method, args)?;
            }
            Dialect::Hg => {
                let method = HgMethod::parse(&request.method)?;
                let args = Args::new(
                    method.name(),
                    request.general_args.clone(),
                    request.options.clone(),
                    method.options(),
                )?;
                if self.mode == Dialect::Git {
                    debug!("switching to hg mode");
                    hg::enter_hg_mode(&mut session)?;
                }
                hg::run(&mut session, method, args)?;
            }
        }
        let partial = report(session);
        self.mode = request.dialect;
        Ok(partial)
    }

    /// Run `body` with rollback on error and verification afterwards.
    fn transaction<F>(&mut self, method: &str, body: F) -> Result<Outcome, CommandError>
    where
        F: FnOnce(&mut Self) -> Result<Partial, CommandError>,
    {
        let snapshot = self.repo.clone();
        let mode = self.mode;

        let partial = match body(self) {
            Ok(partial) => partial,
            Err(err) => {
                debug!(method, error = %err, "command failed; state restored");
                self.repo = snapshot;
                self.mode = mode;
                return Err(err);
            }
        };

        if self.settings.verify {
            let mut errors: Vec<String> = fast_verify(&self.repo.local)
                .errors
                .iter()
                .map(ToString::to_string)
                .collect();
            if let Some(origin) = self.repo.origin.as_ref() {
                errors.extend(fast_verify(origin).errors.iter().map(ToString::to_string));
            }
            if !errors.is_empty() {
                warn!(method, ?errors, "verification failed; state restored");
                self.repo = snapshot;
                self.mode = mode;
                return Err(CommandError::Corrupted {
                    method: method.to_string(),
                    details: errors.join("; "),
                });
            }
        }

        let changes = self.repo.take_changes();
        debug!(method, status = ?partial.status, changes = changes.len(), "command done");
        Ok(Outcome {
            status: partial.status,
            message: partial.message,
            warnings: partial.warnings,
            changes,
            plan: partial.plan,
        })
    }
}

/// What a session reported, before changes are collected.
struct Partial {
    status: Status,
    message: Option<String>,
    warnings: Vec<String>,
    plan: Option<RebasePlan>,
}

fn report(session: Session<'_>) -> Partial {
    Partial {
        status: session.status,
        message: session.message,
        warnings: session.warnings,
        plan: session.plan,
    }
}
