//! Runtime for the rotation solver.
//!
//! This crate turns a validated [`RuleCascade`](rotation_core::RuleCascade)
//! into decisions. [`Engine`] evaluates one tick, [`Solver`] keeps the cycle
//! clock between ticks, and [`FrameLoop`] drives a solver against a
//! [`SnapshotProvider`] and an [`Executor`] on a fixed frame interval.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the per-tick priority resolution built on `behavior-tree`
//! - [`solver`] is the session object that survives between ticks
//! - [`api`] exposes the collaborator traits and the frame loop handle
//! - [`events`] provides the topic-based event bus side-channel
//! - [`trace`] describes what happened to every rule in a tick
//! - [`sim`] is a deterministic world for tests and the CLI
//! - `workers` keeps the frame worker internal to the crate
pub mod api;
pub mod engine;
pub mod events;
pub mod frame_loop;
pub mod sim;
pub mod solver;
pub mod trace;

mod workers;

pub use api::{
    CollaboratorKind, ExecutionReport, Executor, FrameHandle, Interceptor, NoopInterceptor, Result,
    RuntimeError, SnapshotProvider,
};
pub use engine::{Engine, TickContext, TickOutcome};
pub use events::{DecisionEvent, Event, EventBus, ExecutionEvent, SessionEvent, Topic};
pub use frame_loop::{FrameLoop, FrameLoopBuilder};
pub use sim::{SimConfig, SimResource, Simulator, World};
pub use solver::Solver;
pub use trace::{RuleOutcome, RuleRecord, TickTrace};
pub use workers::FrameStats;
