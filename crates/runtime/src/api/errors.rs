//! Unified error types surfaced by the runtime API.
//!
//! Ticks never fail; these cover the collaborators around them and the
//! channels between the frame worker and its handle.

use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;

use rotation_core::CascadeError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{kind} not set")]
    CollaboratorNotSet { kind: CollaboratorKind },

    #[error("snapshot provider failed: {0}")]
    Provider(String),

    #[error("executor failed: {0}")]
    Executor(String),

    #[error("frame worker command channel closed")]
    CommandChannelClosed,

    #[error("frame worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("frame worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

#[derive(Debug, Copy, Clone)]
pub enum CollaboratorKind {
    Solver,
    SnapshotProvider,
    Executor,
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CollaboratorKind::Solver => "solver",
            CollaboratorKind::SnapshotProvider => "snapshot provider",
            CollaboratorKind::Executor => "executor",
        };
        write!(f, "{}", label)
    }
}
