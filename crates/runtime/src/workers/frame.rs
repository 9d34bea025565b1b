//! Frame worker that owns the [`Solver`].
//!
//! Runs one tick per frame interval: pull a snapshot, decide, hand the
//! decision to the executor, and feed committed actions back into the
//! solver's history. Commands from [`FrameHandle`](crate::FrameHandle) are
//! handled between frames, so a cascade swap never lands mid-tick.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use rotation_core::{CascadeSpec, GuardRegistry, RuleCascade};

use crate::api::{Executor, Interceptor, Result, RuntimeError, SnapshotProvider};
use crate::events::{Event, EventBus, ExecutionEvent};
use crate::solver::Solver;

/// Commands that can be sent to the frame worker
pub enum Command {
    /// Swap in an already validated cascade.
    ReplaceCascade {
        cascade: RuleCascade,
        reply: oneshot::Sender<()>,
    },
    /// Compile a cascade document against the active catalog, then swap it in.
    /// The old cascade stays active if compilation fails.
    ReloadSpec {
        spec: Box<CascadeSpec>,
        guards: GuardRegistry,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Query frame counters.
    QueryStats { reply: oneshot::Sender<FrameStats> },
    /// Stop after the current frame.
    Shutdown,
}

/// Counters kept by the frame worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frames: u64,
    /// Frames that produced a non-empty decision.
    pub decisions: u64,
    pub committed: u64,
    pub rejected: u64,
    /// Frames skipped because a collaborator failed.
    pub errors: u64,
}

/// Background task driving the solver.
pub struct FrameWorker {
    solver: Solver,
    provider: Arc<dyn SnapshotProvider>,
    executor: Arc<dyn Executor>,
    interceptor: Arc<dyn Interceptor>,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    interval: Duration,
    max_frames: Option<u64>,
    stats: FrameStats,
}

impl FrameWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        solver: Solver,
        provider: Arc<dyn SnapshotProvider>,
        executor: Arc<dyn Executor>,
        interceptor: Arc<dyn Interceptor>,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        interval: Duration,
        max_frames: Option<u64>,
    ) -> Self {
        info!(
            archetype = solver.archetype(),
            interval_ms = interval.as_millis() as u64,
            ?max_frames,
            "FrameWorker initialized"
        );

        Self {
            solver,
            provider,
            executor,
            interceptor,
            command_rx,
            event_bus,
            interval,
            max_frames,
            stats: FrameStats::default(),
        }
    }

    /// Main worker loop. Returns the final counters.
    pub async fn run(mut self) -> FrameStats {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.max_frames.is_some_and(|max| self.stats.frames >= max) {
                debug!(frames = self.stats.frames, "frame budget reached");
                break;
            }

            tokio::select! {
                biased;
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                _ = ticker.tick() => self.frame().await,
            }
        }

        info!(
            frames = self.stats.frames,
            committed = self.stats.committed,
            rejected = self.stats.rejected,
            errors = self.stats.errors,
            "FrameWorker stopped"
        );
        self.stats
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::ReplaceCascade { cascade, reply } => {
                self.solver.replace_cascade(cascade);
                if reply.send(()).is_err() {
                    debug!("ReplaceCascade reply channel closed (caller dropped)");
                }
            }
            Command::ReloadSpec {
                spec,
                guards,
                reply,
            } => {
                let result = spec
                    .compile(self.solver.catalog(), &guards)
                    .map(|cascade| self.solver.replace_cascade(cascade))
                    .map_err(|e| {
                        warn!(error = %e, "cascade reload rejected; keeping active cascade");
                        RuntimeError::from(e)
                    });
                if reply.send(result).is_err() {
                    debug!("ReloadSpec reply channel closed (caller dropped)");
                }
            }
            Command::QueryStats { reply } => {
                if reply.send(self.stats).is_err() {
                    debug!("QueryStats reply channel closed (caller dropped)");
                }
            }
            Command::Shutdown => {}
        }
    }

    /// One tick. Collaborator failures skip the frame; they never stop the loop.
    async fn frame(&mut self) {
        self.stats.frames += 1;

        let snapshot = match self.provider.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "snapshot unavailable; skipping frame");
                self.stats.errors += 1;
                return;
            }
        };

        let decision = self.solver.tick(snapshot);
        if decision.is_empty() {
            return;
        }
        self.stats.decisions += 1;
        self.interceptor.intercept(&decision);

        let report = match self.executor.execute(&decision).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "executor failed; decision dropped");
                self.stats.errors += 1;
                return;
            }
        };

        let tick = self.solver.ticks();
        for (slot, selected) in report.committed {
            self.solver.record_commit(selected.action, slot);
            self.stats.committed += 1;
            self.event_bus.publish(Event::Execution(ExecutionEvent::Committed {
                tick,
                slot,
                selected,
            }));
        }
        for (selected, reason) in report.rejected {
            self.stats.rejected += 1;
            self.event_bus.publish(Event::Execution(ExecutionEvent::Rejected {
                tick,
                selected,
                reason,
            }));
        }
    }
}
