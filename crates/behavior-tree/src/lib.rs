//! Deterministic priority-selection nodes.
//!
//! This library provides a minimal behavior tree tuned for frame-driven
//! decision engines that must answer within a single tick:
//!
//! - **No Running state**: every node answers immediately
//! - **Declaration order is priority**: no scoring, no reordering
//! - **Fault isolation**: a failing or panicking node reports [`Status::Fault`]
//!   and its siblings are still evaluated
//! - **Zero dependencies**: pure Rust with no external crates
//!
//! # Architecture
//!
//! - [`Behavior`]: Core trait for all nodes
//! - [`Status`]: Success, Failure or Fault
//! - [`Selector`]: first-success composite
//! - [`Isolate`]: panic-containing decorator

pub mod behavior;
pub mod builder;
pub mod composite;
pub mod decorator;
pub mod status;

pub use behavior::{Behavior, Leaf};
pub use composite::Selector;
pub use decorator::{FaultSink, Isolate, panic_message};
pub use status::Status;
