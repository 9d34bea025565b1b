//! Event payloads.

use serde::Serialize;

use rotation_core::{DecisionOutput, Denial, Selected, Slot};

/// The decision emitted by one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecisionEvent {
    pub tick: u64,
    pub decision: DecisionOutput,
}

/// Solver lifecycle changes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SessionEvent {
    Activated { archetype: String },
    Reloaded { archetype: String },
    CombatStarted,
    CombatEnded,
}

/// What the executor did with a decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ExecutionEvent {
    Committed { tick: u64, slot: Slot, selected: Selected },
    /// The action was no longer usable at commit time.
    Rejected { tick: u64, selected: Selected, reason: Denial },
}
