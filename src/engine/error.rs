//! engine::error
//!
//! Typed failures returned from [`super::Engine::execute`].
//!
//! Every failure falls into one of three kinds:
//! - **Validation**: the request itself is malformed (bad arguments, unknown
//!   refs, invalid names, unsupported options)
//! - **State**: the request is well-formed but the repository is not in a
//!   state that allows it (deleting the checked-out branch, pushing without
//!   an origin, a non-fast-forward push)
//! - **Internal**: an invariant broke; the engine restored the previous state

use crate::core::graph::GraphError;
use crate::core::types::TypeError;
use crate::remote::SyncError;
use crate::tree::TreeError;
use thiserror::Error;

/// Coarse classification of a [`CommandError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Internal,
}

/// Errors from command execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Malformed request.
    #[error("{0}")]
    Validation(String),

    /// Request not allowed in the current state.
    #[error("{0}")]
    State(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Name(#[from] TypeError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Post-command verification failed and the command was undone.
    #[error("{method} left the graph inconsistent and was rolled back: {details}")]
    Corrupted { method: String, details: String },
}

impl CommandError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation(message.into())
    }

    pub(crate) fn state(message: impl Into<String>) -> Self {
        CommandError::State(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Validation(_) | CommandError::Name(_) => ErrorKind::Validation,
            CommandError::State(_) => ErrorKind::State,
            CommandError::Graph(err) => match err {
                GraphError::RefNotFound(_)
                | GraphError::BadRelativeRef { .. }
                | GraphError::DuplicateRef(_)
                | GraphError::NotABranch(_) => ErrorKind::Validation,
                _ => ErrorKind::Internal,
            },
            CommandError::Sync(err) => match err {
                SyncError::Graph(inner) => CommandError::Graph(inner.clone()).kind(),
                SyncError::Name(_) => ErrorKind::Validation,
                SyncError::NotARemote(_) | SyncError::NotABranch(_) => ErrorKind::Validation,
                _ => ErrorKind::State,
            },
            CommandError::Corrupted { .. } => ErrorKind::Internal,
        }
    }
}

/// Errors from building an engine out of a saved tree.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid tree: {0}")]
    Tree(#[from] TreeError),

    #[error("invalid origin tree: {0}")]
    Origin(#[from] SyncError),
}
