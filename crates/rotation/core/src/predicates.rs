//! Atomic predicates over a snapshot and cycle clock.
//!
//! Every function here is pure: no side effects, safe to call any number of
//! times per tick in any order. [`crate::condition::Condition`] composes them.

use crate::catalog::{ActionCatalog, ActionDef};
use crate::error::ConditionFault;
use crate::ids::{ActionId, ResourceId, StatusId};
use crate::snapshot::{ActionState, Snapshot, StatusEffect, TargetState};
use crate::timing::CycleClock;

/// Comparison operator used by numeric predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cmp {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = ">")]
    Gt,
}

impl Cmp {
    pub fn apply(self, lhs: f32, rhs: f32) -> bool {
        match self {
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Eq => (lhs - rhs).abs() <= f32::EPSILON,
            Cmp::Ge => lhs >= rhs,
            Cmp::Gt => lhs > rhs,
        }
    }

    pub fn apply_count(self, lhs: u32, rhs: u32) -> bool {
        match self {
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Eq => lhs == rhs,
            Cmp::Ge => lhs >= rhs,
            Cmp::Gt => lhs > rhs,
        }
    }
}

/// Whose statuses a status predicate inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subject {
    #[default]
    Actor,
    Target,
}

/// The entity target-facing guards look at: the current target while it is
/// visible and alive, otherwise the nearest living hostile.
pub fn focus_target(snapshot: &Snapshot) -> Option<&TargetState> {
    snapshot
        .current_target
        .and_then(|id| snapshot.target(id))
        .filter(|t| t.is_alive())
        .or_else(|| {
            snapshot
                .hostiles()
                .filter(|t| t.is_alive())
                .min_by(|a, b| a.distance.total_cmp(&b.distance))
        })
}

/// Current value of a resource pool.
fn resource_value(snapshot: &Snapshot, id: ResourceId) -> Result<f32, ConditionFault> {
    let pool = snapshot
        .actor
        .resource(id)
        .ok_or(ConditionFault::MissingResource(id))?;
    finite(pool.current, "resource")
}

pub fn resource_compare(
    snapshot: &Snapshot,
    id: ResourceId,
    cmp: Cmp,
    value: f32,
) -> Result<bool, ConditionFault> {
    Ok(cmp.apply(resource_value(snapshot, id)?, value))
}

/// Reported cooldown state, or an implicit ready state for an action with no
/// cooldown of its own. `None` when the action has a cooldown the snapshot
/// left out.
pub fn cooldown_state(def: &ActionDef, snapshot: &Snapshot) -> Option<ActionState> {
    match snapshot.action(def.id) {
        Some(state) => Some(*state),
        None if def.recast <= 0.0 && def.max_charges <= 1 => {
            Some(ActionState::ready(0.0).with_cast_time(def.cast_time))
        }
        None => None,
    }
}

/// Cooldown state of an action the guard depends on.
pub fn action_state(
    catalog: &ActionCatalog,
    snapshot: &Snapshot,
    id: ActionId,
) -> Result<ActionState, ConditionFault> {
    match catalog.get(id) {
        Some(def) => cooldown_state(def, snapshot),
        None => snapshot.action(id).copied(),
    }
    .ok_or(ConditionFault::MissingAction(id))
}

/// Looks up a status on the actor or on the focus target.
pub fn subject_status<'a>(
    snapshot: &'a Snapshot,
    target: Option<&'a TargetState>,
    subject: Subject,
    id: StatusId,
) -> Option<&'a StatusEffect> {
    match subject {
        Subject::Actor => snapshot.actor.status(id),
        Subject::Target => target.and_then(|t| t.status(id)),
    }
}

/// Status is active and will not expire within `cycles` plus `tolerance`.
///
/// This is the usual "keep it up" check: false both when the status is
/// missing and when it is about to fall off.
pub fn status_active_and_holding(
    clock: &CycleClock,
    status: Option<&StatusEffect>,
    cycles: f32,
    tolerance: f32,
) -> bool {
    status.is_some_and(|s| s.is_active()) && !clock.status_ending_within(status, cycles, tolerance)
}

/// Number of living hostiles within `range` of the actor.
pub fn hostiles_in_range(snapshot: &Snapshot, range: f32) -> u32 {
    snapshot
        .hostiles()
        .filter(|t| t.is_alive() && t.distance <= range)
        .count() as u32
}

/// Distance from the actor to the focus target, if there is one.
pub fn target_distance(target: Option<&TargetState>) -> Option<f32> {
    target.map(|t| t.distance).filter(|d| d.is_finite())
}

pub(crate) fn finite(value: f32, what: &'static str) -> Result<f32, ConditionFault> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConditionFault::NonFinite(what))
    }
}
