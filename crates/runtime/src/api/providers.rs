//! Asynchronous collaborators around the solver.
//!
//! The frame loop pulls a [`Snapshot`] from a [`SnapshotProvider`], runs one
//! tick, and hands the decision to an [`Executor`]. Both can be backed by a
//! live client, a replay, or the deterministic [`Simulator`](crate::Simulator).

use async_trait::async_trait;
use serde::Serialize;

use rotation_core::{DecisionOutput, Denial, Selected, Slot, Snapshot};

use super::errors::Result;

/// Produces one consistent snapshot per tick.
///
/// The snapshot must be fully formed before it is returned; the solver never
/// observes a world update in progress.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot>;
}

/// Result of applying a decision.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExecutionReport {
    /// Actions actually submitted, main first.
    pub committed: Vec<(Slot, Selected)>,
    /// Actions dropped because they were no longer usable at commit time.
    pub rejected: Vec<(Selected, Denial)>,
}

impl ExecutionReport {
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.rejected.is_empty()
    }
}

/// Submits decisions to the world.
///
/// Implementations re-validate each action before committing it: the
/// decision was correct for the snapshot it came from, not necessarily for
/// the world at commit time.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, decision: &DecisionOutput) -> Result<ExecutionReport>;
}

/// Suppresses manual input that would conflict with a pending decision.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, decision: &DecisionOutput);
}

/// Interceptor that lets everything through.
pub struct NoopInterceptor;

impl Interceptor for NoopInterceptor {
    fn intercept(&self, _decision: &DecisionOutput) {}
}
