//! High-level frame loop orchestrator.
//!
//! [`FrameLoop`] spawns the frame worker, wires up the command channel and
//! event bus, and hands out [`FrameHandle`]s for clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::api::{
    CollaboratorKind, Executor, FrameHandle, Interceptor, NoopInterceptor, Result, RuntimeError,
    SnapshotProvider,
};
use crate::events::{Event, EventBus, Topic};
use crate::sim::Simulator;
use crate::solver::Solver;
use crate::workers::{FrameStats, FrameWorker};

const COMMAND_BUFFER_SIZE: usize = 32;

/// A running frame loop.
pub struct FrameLoop {
    handle: FrameHandle,
    worker: JoinHandle<FrameStats>,
}

impl FrameLoop {
    /// Create a new frame loop builder
    pub fn builder() -> FrameLoopBuilder {
        FrameLoopBuilder::new()
    }

    /// Get a cloneable handle to this loop
    pub fn handle(&self) -> FrameHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Waits for the loop to stop on its own (frame budget reached).
    pub async fn wait(self) -> Result<FrameStats> {
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }

    /// Stops the loop after the current frame.
    pub async fn shutdown(self) -> Result<FrameStats> {
        // The worker may already have stopped on its frame budget.
        let _ = self.handle.shutdown().await;
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`FrameLoop`].
pub struct FrameLoopBuilder {
    solver: Option<Solver>,
    provider: Option<Arc<dyn SnapshotProvider>>,
    executor: Option<Arc<dyn Executor>>,
    interceptor: Arc<dyn Interceptor>,
    event_bus: Option<EventBus>,
    interval: Option<Duration>,
    max_frames: Option<u64>,
}

impl FrameLoopBuilder {
    fn new() -> Self {
        Self {
            solver: None,
            provider: None,
            executor: None,
            interceptor: Arc::new(NoopInterceptor),
            event_bus: None,
            interval: None,
            max_frames: None,
        }
    }

    pub fn solver(mut self, solver: Solver) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn provider(mut self, provider: impl SnapshotProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Use one simulator as both snapshot provider and executor.
    pub fn simulator(mut self, simulator: Simulator) -> Self {
        let provider: Arc<dyn SnapshotProvider> = Arc::new(simulator.clone());
        let executor: Arc<dyn Executor> = Arc::new(simulator);
        self.provider = Some(provider);
        self.executor = Some(executor);
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor = Arc::new(interceptor);
        self
    }

    /// Share an existing bus instead of creating one from the solver config.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Override `frame.interval_ms` from the solver config.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Stop after this many frames.
    pub fn max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Spawn the frame worker
    pub async fn build(self) -> Result<FrameLoop> {
        let solver = self.solver.ok_or(RuntimeError::CollaboratorNotSet {
            kind: CollaboratorKind::Solver,
        })?;
        let provider = self.provider.ok_or(RuntimeError::CollaboratorNotSet {
            kind: CollaboratorKind::SnapshotProvider,
        })?;
        let executor = self.executor.ok_or(RuntimeError::CollaboratorNotSet {
            kind: CollaboratorKind::Executor,
        })?;

        let config = solver.config().clone();
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(config.bus.capacity));
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_millis(config.frame.interval_ms));

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let handle = FrameHandle::new(command_tx, event_bus.clone());

        let worker = FrameWorker::new(
            solver.with_bus(event_bus.clone()),
            provider,
            executor,
            self.interceptor,
            command_rx,
            event_bus,
            interval,
            self.max_frames,
        );
        let worker = tokio::spawn(worker.run());

        Ok(FrameLoop { handle, worker })
    }
}
