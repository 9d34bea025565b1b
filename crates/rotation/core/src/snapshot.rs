//! Immutable per-tick view of the world.
//!
//! A [`Snapshot`] is produced by the host once per tick and is never mutated
//! afterwards. The decision engine reads the same snapshot for the whole tick,
//! which is what makes its output internally consistent and reproducible.
//!
//! All durations are in seconds.

use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{ActionId, ResourceId, StatusId, TargetId};

/// World state as observed at the start of one tick.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// The actor the solver is driving.
    pub actor: ActorState,

    /// Cooldown state of every catalog action the host knows about.
    pub actions: BTreeMap<ActionId, ActionState>,

    /// Every visible entity, in the host's order.
    pub targets: Vec<TargetState>,

    /// The entity the actor currently has selected, if any.
    pub current_target: Option<TargetId>,

    /// Remaining seconds of a pre-combat countdown, if one is running.
    pub countdown: Option<f32>,

    /// Play-style switches the host has turned on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modes: BTreeSet<Mode>,
}

impl Snapshot {
    /// Starts building a snapshot.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Cooldown state of an action, if the host reported it.
    pub fn action(&self, id: ActionId) -> Option<&ActionState> {
        self.actions.get(&id)
    }

    /// Looks up a visible entity by id.
    pub fn target(&self, id: TargetId) -> Option<&TargetState> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Visible hostile entities.
    pub fn hostiles(&self) -> impl Iterator<Item = &TargetState> {
        self.targets.iter().filter(|t| t.hostile)
    }

    /// Returns `true` if a countdown is running.
    pub fn countdown_active(&self) -> bool {
        matches!(self.countdown, Some(remaining) if remaining > 0.0)
    }

    pub fn mode(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }
}

/// Host-controlled switch a cascade can gate rules on.
///
/// The solver never sets these; the player or host UI does, and they hold
/// until the host clears them.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    /// Spend cooldowns and burst resources.
    Burst,
    DefenseSingle,
    DefenseArea,
    HealSingle,
    HealArea,
}

/// The controlled actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorState {
    pub level: u32,
    pub resources: BTreeMap<ResourceId, ResourcePool>,
    pub statuses: Vec<StatusEffect>,
    pub position: Position,
    pub moving: bool,
    pub in_combat: bool,
    /// Seconds since combat started; zero out of combat.
    pub combat_elapsed: f32,
    /// Seconds until the main cycle slot frees up.
    pub main_recast_remaining: f32,
    /// Seconds left on the cast in progress; zero when not casting.
    pub cast_remaining: f32,
    /// Seconds left on the animation lock of the last action.
    pub animation_lock_remaining: f32,
}

impl Default for ActorState {
    fn default() -> Self {
        Self {
            level: 1,
            resources: BTreeMap::new(),
            statuses: Vec::new(),
            position: Position::ORIGIN,
            moving: false,
            in_combat: false,
            combat_elapsed: 0.0,
            main_recast_remaining: 0.0,
            cast_remaining: 0.0,
            animation_lock_remaining: 0.0,
        }
    }
}

impl ActorState {
    pub fn resource(&self, id: ResourceId) -> Option<&ResourcePool> {
        self.resources.get(&id)
    }

    /// Returns the active effect with the given id, ignoring expired ones.
    pub fn status(&self, id: StatusId) -> Option<&StatusEffect> {
        find_status(&self.statuses, id)
    }

    pub fn has_status(&self, id: StatusId) -> bool {
        self.status(id).is_some()
    }

    /// Casting or animation-locked: nothing can be used right now.
    pub fn is_mid_action(&self) -> bool {
        self.cast_remaining > 0.0 || self.animation_lock_remaining > 0.0
    }

    /// The main slot can be taken this tick.
    pub fn main_slot_free(&self) -> bool {
        !self.is_mid_action() && self.main_recast_remaining <= 0.0
    }
}

/// A bounded numeric resource.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourcePool {
    pub current: f32,
    pub max: f32,
}

impl ResourcePool {
    pub fn new(current: f32, max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: current.clamp(0.0, max),
            max,
        }
    }

    /// Current value as a fraction of the maximum (0.0 when max is zero).
    pub fn ratio(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

/// A timed buff or debuff.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    pub id: StatusId,
    /// Seconds until expiry; `f32::INFINITY` for effects without a timer.
    pub remaining: f32,
    pub stacks: u8,
}

impl StatusEffect {
    pub fn new(id: StatusId, remaining: f32) -> Self {
        Self {
            id,
            remaining,
            stacks: 1,
        }
    }

    pub fn permanent(id: StatusId) -> Self {
        Self::new(id, f32::INFINITY)
    }

    pub fn with_stacks(mut self, stacks: u8) -> Self {
        self.stacks = stacks;
        self
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0 && self.stacks > 0
    }
}

pub(crate) fn find_status(statuses: &[StatusEffect], id: StatusId) -> Option<&StatusEffect> {
    statuses.iter().find(|s| s.id == id && s.is_active())
}

/// Cooldown state of one action.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionState {
    pub charges: u8,
    pub max_charges: u8,
    /// Seconds until the next charge is restored; zero when capped.
    pub recast_remaining: f32,
    pub cast_time: f32,
    /// Seconds to restore one charge.
    pub recast_interval: f32,
}

impl ActionState {
    /// A single-charge action that is ready now.
    pub fn ready(recast_interval: f32) -> Self {
        Self {
            charges: 1,
            max_charges: 1,
            recast_remaining: 0.0,
            cast_time: 0.0,
            recast_interval,
        }
    }

    /// A single-charge action recovering for `remaining` more seconds.
    pub fn cooling(remaining: f32, recast_interval: f32) -> Self {
        Self {
            charges: 0,
            max_charges: 1,
            recast_remaining: remaining,
            cast_time: 0.0,
            recast_interval,
        }
    }

    pub fn with_charges(mut self, charges: u8, max_charges: u8) -> Self {
        self.charges = charges.min(max_charges);
        self.max_charges = max_charges;
        self
    }

    pub fn with_recast_remaining(mut self, remaining: f32) -> Self {
        self.recast_remaining = remaining;
        self
    }

    pub fn with_cast_time(mut self, cast_time: f32) -> Self {
        self.cast_time = cast_time;
        self
    }

    pub fn has_charge(&self) -> bool {
        self.charges >= 1
    }

    pub fn is_capped(&self) -> bool {
        self.charges >= self.max_charges
    }
}

/// A visible entity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetState {
    pub id: TargetId,
    /// Health as a fraction of maximum (0.0..=1.0).
    pub health_ratio: f32,
    pub distance: f32,
    pub hostile: bool,
    /// The entity is currently attacking the actor.
    pub has_aggro: bool,
    pub in_line_of_sight: bool,
    pub statuses: Vec<StatusEffect>,
}

impl TargetState {
    /// A full-health hostile entity in line of sight.
    pub fn hostile(id: TargetId, distance: f32) -> Self {
        Self {
            id,
            health_ratio: 1.0,
            distance,
            hostile: true,
            has_aggro: false,
            in_line_of_sight: true,
            statuses: Vec::new(),
        }
    }

    /// A full-health friendly entity in line of sight.
    pub fn friendly(id: TargetId, distance: f32) -> Self {
        Self {
            hostile: false,
            ..Self::hostile(id, distance)
        }
    }

    pub fn with_health(mut self, ratio: f32) -> Self {
        self.health_ratio = ratio;
        self
    }

    pub fn with_status(mut self, status: StatusEffect) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn status(&self, id: StatusId) -> Option<&StatusEffect> {
        find_status(&self.statuses, id)
    }

    /// Alive (health above zero).
    pub fn is_alive(&self) -> bool {
        self.health_ratio > 0.0
    }
}

/// World position of the actor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Fluent constructor for [`Snapshot`].
///
/// Snapshot providers fill one of these per tick and call
/// [`SnapshotBuilder::build`], after which the snapshot is frozen.
#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn level(mut self, level: u32) -> Self {
        self.snapshot.actor.level = level;
        self
    }

    pub fn resource(mut self, id: ResourceId, current: f32, max: f32) -> Self {
        self.snapshot
            .actor
            .resources
            .insert(id, ResourcePool::new(current, max));
        self
    }

    pub fn status(mut self, status: StatusEffect) -> Self {
        self.snapshot.actor.statuses.push(status);
        self
    }

    pub fn action(mut self, id: ActionId, state: ActionState) -> Self {
        self.snapshot.actions.insert(id, state);
        self
    }

    pub fn target(mut self, target: TargetState) -> Self {
        self.snapshot.targets.push(target);
        self
    }

    pub fn current_target(mut self, id: TargetId) -> Self {
        self.snapshot.current_target = Some(id);
        self
    }

    /// Marks the actor in combat for `elapsed` seconds.
    pub fn in_combat(mut self, elapsed: f32) -> Self {
        self.snapshot.actor.in_combat = true;
        self.snapshot.actor.combat_elapsed = elapsed;
        self
    }

    pub fn moving(mut self, moving: bool) -> Self {
        self.snapshot.actor.moving = moving;
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.snapshot.actor.position = position;
        self
    }

    pub fn main_recast(mut self, remaining: f32) -> Self {
        self.snapshot.actor.main_recast_remaining = remaining;
        self
    }

    pub fn casting(mut self, remaining: f32) -> Self {
        self.snapshot.actor.cast_remaining = remaining;
        self
    }

    pub fn animation_lock(mut self, remaining: f32) -> Self {
        self.snapshot.actor.animation_lock_remaining = remaining;
        self
    }

    pub fn countdown(mut self, remaining: f32) -> Self {
        self.snapshot.countdown = Some(remaining);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.snapshot.modes.insert(mode);
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_statuses_are_ignored() {
        let snapshot = Snapshot::builder()
            .status(StatusEffect::new(StatusId(1), 0.0))
            .status(StatusEffect::new(StatusId(2), 3.0))
            .build();

        assert!(!snapshot.actor.has_status(StatusId(1)));
        assert!(snapshot.actor.has_status(StatusId(2)));
    }

    #[test]
    fn casting_occupies_main_slot() {
        let idle = Snapshot::builder().build();
        let casting = Snapshot::builder().casting(1.2).build();
        let recasting = Snapshot::builder().main_recast(0.8).build();

        assert!(idle.actor.main_slot_free());
        assert!(!casting.actor.main_slot_free());
        assert!(casting.actor.is_mid_action());
        assert!(!recasting.actor.main_slot_free());
        assert!(!recasting.actor.is_mid_action());
    }

    #[test]
    fn resource_pool_clamps_to_max() {
        let pool = ResourcePool::new(150.0, 100.0);
        assert_eq!(pool.current, 100.0);
        assert_eq!(pool.ratio(), 1.0);
        assert_eq!(ResourcePool::new(5.0, 0.0).ratio(), 0.0);
    }

    #[test]
    fn modes_are_named_in_snake_case() {
        let snapshot = Snapshot::builder().mode(Mode::Burst).build();
        assert!(snapshot.mode(Mode::Burst));
        assert!(!snapshot.mode(Mode::HealArea));

        assert_eq!("heal_single".parse::<Mode>(), Ok(Mode::HealSingle));
        assert_eq!(Mode::DefenseArea.to_string(), "defense_area");
        assert!("healing".parse::<Mode>().is_err());
    }
}
