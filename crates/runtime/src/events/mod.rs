//! Topic-based event bus for solver events.
//!
//! Decisions, traces and session changes are published to separate topics so
//! an observer (a debugging UI, a log sink) subscribes only to what it needs.
//! Publishing is a side-channel: it never feeds back into a decision.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{DecisionEvent, ExecutionEvent, SessionEvent};
