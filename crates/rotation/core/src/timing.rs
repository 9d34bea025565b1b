//! Cycle and timing tracker.
//!
//! [`CycleClock`] is the only decision state that survives between ticks. It
//! is refreshed from each snapshot and owns the forward-projection queries
//! that timing-sensitive guards share, so every rule rounds the same way.

use arrayvec::ArrayVec;

use crate::catalog::Slot;
use crate::config::TimingConfig;
use crate::ids::{ActionId, StatusId};
use crate::snapshot::{ActionState, Snapshot, StatusEffect};

/// A status that shortens the cycle by `percent` while active.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Haste {
    pub status: StatusId,
    pub percent: f32,
}

/// Where a weave would land inside the current cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeaveWindow {
    /// Nothing left of the cycle.
    None,
    Early,
    /// Below the late-weave threshold; a long lock may clip the next main action.
    Late,
}

/// Combat state change observed by [`CycleClock::refresh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatEdge {
    Unchanged,
    Started,
    Ended,
}

/// An action the executor actually committed.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommittedAction {
    pub action: ActionId,
    pub slot: Slot,
    /// Combat time of the commit.
    pub at: f32,
}

const HISTORY_CAPACITY: usize = TimingConfig::MAX_HISTORY_LEN;

/// Derived timing facts, refreshed once per tick.
#[derive(Clone, Debug)]
pub struct CycleClock {
    base_cycle_length: f32,
    cycle_length: f32,
    cycle_remaining: f32,
    late_fraction: f32,
    floor: f32,
    in_combat: bool,
    combat_elapsed: f32,
    history_len: usize,
    history: ArrayVec<CommittedAction, HISTORY_CAPACITY>,
    main_since_combat_start: u32,
}

impl CycleClock {
    /// Creates a clock for an archetype with the given unhasted cycle length.
    pub fn new(base_cycle_length: f32, config: &TimingConfig) -> Self {
        let floor = config.cycle_floor();
        let base = if base_cycle_length.is_finite() {
            base_cycle_length.max(floor)
        } else {
            floor
        };
        Self {
            base_cycle_length: base,
            cycle_length: base,
            cycle_remaining: 0.0,
            late_fraction: config.weave_fraction(),
            floor,
            in_combat: false,
            combat_elapsed: 0.0,
            history_len: config.history_len.clamp(1, HISTORY_CAPACITY),
            history: ArrayVec::new(),
            main_since_combat_start: 0,
        }
    }

    /// Recomputes the derived facts from a fresh snapshot.
    ///
    /// Leaving combat clears the action history; entering combat starts a
    /// fresh one.
    pub fn refresh(&mut self, snapshot: &Snapshot, haste: &[Haste]) -> CombatEdge {
        let actor = &snapshot.actor;

        let haste_percent: f32 = haste
            .iter()
            .filter(|h| actor.has_status(h.status))
            .map(|h| h.percent)
            .filter(|p| p.is_finite())
            .sum();
        self.cycle_length = self.floored(self.base_cycle_length * (1.0 - haste_percent / 100.0));

        self.cycle_remaining = finite_non_negative(actor.main_recast_remaining)
            .max(finite_non_negative(actor.cast_remaining))
            .max(finite_non_negative(actor.animation_lock_remaining));

        let edge = match (self.in_combat, actor.in_combat) {
            (false, true) => CombatEdge::Started,
            (true, false) => CombatEdge::Ended,
            _ => CombatEdge::Unchanged,
        };
        if edge != CombatEdge::Unchanged {
            self.reset_combat();
        }
        self.in_combat = actor.in_combat;
        self.combat_elapsed = if actor.in_combat {
            finite_non_negative(actor.combat_elapsed)
        } else {
            0.0
        };
        edge
    }

    /// Replaces the unhasted cycle length, e.g. after a cascade reload.
    pub fn set_base_cycle_length(&mut self, base: f32) {
        self.base_cycle_length = self.floored(base);
        self.cycle_length = self.base_cycle_length;
    }

    fn floored(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.max(self.floor)
        } else {
            self.floor
        }
    }

    fn reset_combat(&mut self) {
        self.history.clear();
        self.main_since_combat_start = 0;
        self.combat_elapsed = 0.0;
    }

    // ========================================================================
    // Derived facts
    // ========================================================================

    /// Hasted cycle length, never below the configured floor.
    pub fn cycle_length(&self) -> f32 {
        self.cycle_length
    }

    pub fn base_cycle_length(&self) -> f32 {
        self.base_cycle_length
    }

    /// Seconds until the next main action may be taken.
    pub fn cycle_remaining(&self) -> f32 {
        self.cycle_remaining
    }

    pub fn late_weave_threshold(&self) -> f32 {
        self.cycle_length * self.late_fraction
    }

    pub fn weave_window(&self) -> WeaveWindow {
        if self.cycle_remaining <= 0.0 {
            WeaveWindow::None
        } else if self.cycle_remaining > self.late_weave_threshold() {
            WeaveWindow::Early
        } else {
            WeaveWindow::Late
        }
    }

    pub fn in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn combat_elapsed(&self) -> f32 {
        self.combat_elapsed
    }

    // ========================================================================
    // Forward projection
    // ========================================================================

    /// Seconds covered by `cycles` full cycles.
    pub fn cycles_to_seconds(&self, cycles: f32) -> f32 {
        if cycles.is_finite() {
            cycles.max(0.0) * self.cycle_length
        } else {
            0.0
        }
    }

    /// Will the action have a charge after `n` more cycles?
    ///
    /// `n == 0` is the action's availability right now.
    pub fn will_have_charge_after_cycles(&self, action: &ActionState, n: u32) -> bool {
        self.will_have_charge_after_seconds(action, self.cycles_to_seconds(n as f32))
    }

    /// Will the action have a charge after `t` seconds?
    pub fn will_have_charge_after_seconds(&self, action: &ActionState, t: f32) -> bool {
        charges_after_seconds(action, t) >= 1
    }

    /// Will the action hold at least `charges` charges after `n` cycles?
    pub fn will_have_charges_after_cycles(&self, action: &ActionState, charges: u8, n: u32) -> bool {
        charges_after_seconds(action, self.cycles_to_seconds(n as f32)) >= charges
    }

    /// Is the status active and due to expire within `n` cycles plus
    /// `tolerance` seconds?
    ///
    /// An absent status is not "ending soon"; callers that want to refresh a
    /// missing status test for its absence separately.
    pub fn status_ending_within(&self, status: Option<&StatusEffect>, n: f32, tolerance: f32) -> bool {
        match status {
            Some(s) if s.is_active() => {
                let tolerance = if tolerance.is_finite() { tolerance.max(0.0) } else { 0.0 };
                s.remaining <= self.cycles_to_seconds(n) + tolerance
            }
            _ => false,
        }
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Records an action the executor committed.
    pub fn record_commit(&mut self, action: ActionId, slot: Slot) {
        if self.history.len() >= self.history_len {
            self.history.remove(0);
        }
        self.history.push(CommittedAction {
            action,
            slot,
            at: self.combat_elapsed,
        });
        if slot == Slot::Main && self.in_combat {
            self.main_since_combat_start = self.main_since_combat_start.saturating_add(1);
        }
    }

    /// Committed actions, oldest first.
    pub fn history(&self) -> &[CommittedAction] {
        &self.history
    }

    pub fn last_main(&self) -> Option<ActionId> {
        self.last_in_slot(Slot::Main)
    }

    pub fn last_weave(&self) -> Option<ActionId> {
        self.last_in_slot(Slot::Weave)
    }

    fn last_in_slot(&self, slot: Slot) -> Option<ActionId> {
        self.history
            .iter()
            .rev()
            .find(|c| c.slot == slot)
            .map(|c| c.action)
    }

    pub fn main_actions_since_combat_start(&self) -> u32 {
        self.main_since_combat_start
    }
}

/// Charges the action will hold after `t` seconds, capped at its maximum.
pub fn charges_after_seconds(action: &ActionState, t: f32) -> u8 {
    if !t.is_finite() || t <= 0.0 || action.is_capped() {
        return action.charges;
    }
    let remaining = finite_non_negative(action.recast_remaining);
    if t < remaining {
        return action.charges;
    }
    let extra = if action.recast_interval.is_finite() && action.recast_interval > 0.0 {
        1 + ((t - remaining) / action.recast_interval).floor() as u32
    } else {
        1
    };
    let total = u32::from(action.charges).saturating_add(extra);
    total.min(u32::from(action.max_charges)) as u8
}

fn finite_non_negative(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(base: f32) -> CycleClock {
        CycleClock::new(base, &TimingConfig::default())
    }

    #[test]
    fn zero_cycles_is_current_availability() {
        let clock = clock(2.5);
        let ready = ActionState::ready(30.0);
        let cooling = ActionState::cooling(0.0, 30.0);

        assert!(clock.will_have_charge_after_cycles(&ready, 0));
        assert!(!clock.will_have_charge_after_cycles(&cooling, 0));
    }

    #[test]
    fn projects_recast_over_cycles() {
        let clock = clock(2.5);
        let cooling = ActionState::cooling(6.0, 30.0);

        assert!(!clock.will_have_charge_after_cycles(&cooling, 2));
        assert!(clock.will_have_charge_after_cycles(&cooling, 3));
        assert!(clock.will_have_charge_after_seconds(&cooling, 6.0));
    }

    #[test]
    fn epsilon_cycle_length_does_not_divide_by_zero() {
        let clock = clock(0.0);
        assert_eq!(clock.cycle_length(), TimingConfig::DEFAULT_MIN_CYCLE_LENGTH);

        let cooling = ActionState::cooling(1.0, 30.0);
        assert!(!clock.will_have_charge_after_cycles(&cooling, 10));
        assert!(clock.will_have_charge_after_cycles(&cooling, 200));
    }

    #[test]
    fn multi_charge_projection() {
        let state = ActionState::cooling(5.0, 20.0).with_charges(1, 3);

        assert_eq!(charges_after_seconds(&state, 0.0), 1);
        assert_eq!(charges_after_seconds(&state, 5.0), 2);
        assert_eq!(charges_after_seconds(&state, 25.0), 3);
        assert_eq!(charges_after_seconds(&state, 500.0), 3);
    }

    #[test]
    fn haste_shortens_cycle() {
        let mut clock = clock(2.5);
        let haste = [Haste {
            status: StatusId(3),
            percent: 20.0,
        }];
        let snapshot = Snapshot::builder()
            .status(StatusEffect::new(StatusId(3), 10.0))
            .build();

        clock.refresh(&snapshot, &haste);
        assert!((clock.cycle_length() - 2.0).abs() < 1e-6);

        clock.refresh(&Snapshot::default(), &haste);
        assert_eq!(clock.cycle_length(), 2.5);
    }

    #[test]
    fn weave_window_classification() {
        let mut clock = clock(2.5);
        let haste = [];

        clock.refresh(&Snapshot::builder().main_recast(2.0).build(), &haste);
        assert_eq!(clock.weave_window(), WeaveWindow::Early);

        clock.refresh(&Snapshot::builder().main_recast(0.5).build(), &haste);
        assert_eq!(clock.weave_window(), WeaveWindow::Late);

        clock.refresh(&Snapshot::default(), &haste);
        assert_eq!(clock.weave_window(), WeaveWindow::None);
    }

    #[test]
    fn cycle_remaining_covers_cast_and_lock() {
        let mut clock = clock(2.5);
        clock.refresh(
            &Snapshot::builder().main_recast(0.2).casting(1.1).animation_lock(0.4).build(),
            &[],
        );
        assert_eq!(clock.cycle_remaining(), 1.1);
    }

    #[test]
    fn history_resets_when_combat_ends() {
        let mut clock = clock(2.5);
        assert_eq!(
            clock.refresh(&Snapshot::builder().in_combat(1.0).build(), &[]),
            CombatEdge::Started
        );
        clock.record_commit(ActionId(1), Slot::Main);
        clock.record_commit(ActionId(2), Slot::Weave);

        assert_eq!(clock.last_main(), Some(ActionId(1)));
        assert_eq!(clock.last_weave(), Some(ActionId(2)));
        assert_eq!(clock.main_actions_since_combat_start(), 1);

        assert_eq!(clock.refresh(&Snapshot::default(), &[]), CombatEdge::Ended);
        assert!(clock.history().is_empty());
        assert_eq!(clock.main_actions_since_combat_start(), 0);
    }

    #[test]
    fn history_is_bounded() {
        let config = TimingConfig {
            history_len: 2,
            ..TimingConfig::default()
        };
        let mut clock = CycleClock::new(2.5, &config);
        for id in 0..5 {
            clock.record_commit(ActionId(id), Slot::Main);
        }
        let kept: Vec<_> = clock.history().iter().map(|c| c.action).collect();
        assert_eq!(kept, vec![ActionId(3), ActionId(4)]);
    }

    #[test]
    fn status_ending_soon() {
        let clock = clock(2.5);
        let short = StatusEffect::new(StatusId(1), 3.0);

        assert!(clock.status_ending_within(Some(&short), 1.0, 0.5));
        assert!(!clock.status_ending_within(Some(&short), 1.0, 0.0));
        assert!(!clock.status_ending_within(None, 5.0, 0.0));
    }
}
