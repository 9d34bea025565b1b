//! The CanUse gate.
//!
//! [`can_use`] is a pure query: it never spends resources or charges, so the
//! engine can evaluate any number of candidates per tick. Checks run in a fixed
//! order and the first failing one short-circuits with a [`Denial`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::{ActionDef, TargetKind};
use crate::condition::{Condition, EvalScope};
use crate::error::ConditionFault;
use crate::ids::{ActionId, ResourceId, StatusId, TargetId};
use crate::predicates;
use crate::snapshot::{Snapshot, TargetState};

/// How a rule picks among valid targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetStrategy {
    /// The selected target if valid, else the nearest valid one.
    #[default]
    Current,
    Nearest,
    Furthest,
    LowestHealth,
    HighestHealth,
    /// The actor itself; only valid for actions that may target friendlies.
    SelfOnly,
}

/// What an accepted action is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    Actor,
    Entity(TargetId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Actor => f.write_str("self"),
            Target::Entity(id) => write!(f, "{id}"),
        }
    }
}

/// Why an action is not usable right now.
///
/// Not an error: denials are the normal way a cascade falls through.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Denial {
    UnknownAction,
    Disabled,
    LevelTooLow { required: u32, level: u32 },
    InsufficientResource { resource: ResourceId, needed: f32, available: f32 },
    NoCooldownState,
    NoCharge,
    ChargeReserved,
    MissingStatus(StatusId),
    ForbiddenStatus(StatusId),
    CastWhileMoving,
    NoValidTarget,
    ActionGuard,
    /// The per-action guard could not be evaluated.
    ActionGuardFault(ConditionFault),
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::UnknownAction => f.write_str("not in catalog"),
            Denial::Disabled => f.write_str("disabled"),
            Denial::LevelTooLow { required, level } => {
                write!(f, "requires level {required} (actor is {level})")
            }
            Denial::InsufficientResource {
                resource,
                needed,
                available,
            } => write!(f, "needs {needed} {resource}, has {available}"),
            Denial::NoCooldownState => f.write_str("no cooldown state reported"),
            Denial::NoCharge => f.write_str("no charge available"),
            Denial::ChargeReserved => f.write_str("last charge reserved"),
            Denial::MissingStatus(s) => write!(f, "requires {s}"),
            Denial::ForbiddenStatus(s) => write!(f, "blocked by {s}"),
            Denial::CastWhileMoving => f.write_str("cannot cast while moving"),
            Denial::NoValidTarget => f.write_str("no valid target"),
            Denial::ActionGuard => f.write_str("action guard rejected"),
            Denial::ActionGuardFault(fault) => write!(f, "action guard fault: {fault}"),
        }
    }
}

/// Per-action overrides a cascade applies on top of the catalog.
#[derive(Clone, Debug, Default)]
pub struct ActionOverrides {
    pub disabled: BTreeSet<ActionId>,
    /// Extra condition checked as the last usability step.
    pub guards: BTreeMap<ActionId, Condition>,
}

/// One CanUse query.
#[derive(Clone, Copy, Debug)]
pub struct UseRequest {
    pub action: ActionId,
    pub strategy: TargetStrategy,
    /// Keep one charge of a multi-charge action in reserve unless capped.
    pub reserve_charge: bool,
}

impl UseRequest {
    pub fn new(action: ActionId) -> Self {
        Self {
            action,
            strategy: TargetStrategy::default(),
            reserve_charge: false,
        }
    }
}

/// Decides whether an action is usable against the scope's snapshot and,
/// if so, binds its target.
pub fn can_use(
    overrides: &ActionOverrides,
    request: &UseRequest,
    scope: &EvalScope<'_>,
) -> Result<Target, Denial> {
    let snapshot = scope.snapshot;
    let actor = &snapshot.actor;
    let def = scope.catalog.get(request.action).ok_or(Denial::UnknownAction)?;

    if overrides.disabled.contains(&def.id) {
        return Err(Denial::Disabled);
    }
    if actor.level < def.level {
        return Err(Denial::LevelTooLow {
            required: def.level,
            level: actor.level,
        });
    }

    for cost in &def.costs {
        let available = actor.resource(cost.resource).map_or(0.0, |p| p.current);
        if !(available >= cost.amount) {
            return Err(Denial::InsufficientResource {
                resource: cost.resource,
                needed: cost.amount,
                available,
            });
        }
    }

    let state = predicates::cooldown_state(def, snapshot).ok_or(Denial::NoCooldownState)?;
    if !state.has_charge() {
        return Err(Denial::NoCharge);
    }
    if request.reserve_charge && state.max_charges > 1 && state.charges < 2 && !state.is_capped() {
        return Err(Denial::ChargeReserved);
    }

    if let Some(missing) = def.requires.iter().find(|s| !actor.has_status(**s)) {
        return Err(Denial::MissingStatus(*missing));
    }
    if let Some(blocking) = def.forbids.iter().find(|s| actor.has_status(**s)) {
        return Err(Denial::ForbiddenStatus(*blocking));
    }

    if actor.moving && state.cast_time > 0.0 && !def.instant_with.iter().any(|s| actor.has_status(*s)) {
        return Err(Denial::CastWhileMoving);
    }

    let target = select_target(def, request.strategy, snapshot).ok_or(Denial::NoValidTarget)?;

    if let Some(guard) = overrides.guards.get(&def.id) {
        match guard.evaluate(scope) {
            Ok(true) => {}
            Ok(false) => return Err(Denial::ActionGuard),
            Err(fault) => return Err(Denial::ActionGuardFault(fault)),
        }
    }

    Ok(target)
}

/// Is `target` a valid target for `def`: alive, visible, right hostility and
/// in range?
pub fn is_valid_target(def: &ActionDef, target: &TargetState) -> bool {
    target.is_alive()
        && target.in_line_of_sight
        && def.target.accepts(target.hostile)
        && target.distance.is_finite()
        && target.distance <= def.range
}

/// Applies a target strategy to the snapshot's valid targets.
pub fn select_target(def: &ActionDef, strategy: TargetStrategy, snapshot: &Snapshot) -> Option<Target> {
    if def.target == TargetKind::Actor {
        return Some(Target::Actor);
    }
    if strategy == TargetStrategy::SelfOnly {
        return def.target.accepts(false).then_some(Target::Actor);
    }

    let valid = snapshot.targets.iter().filter(|t| is_valid_target(def, t));
    let picked = match strategy {
        TargetStrategy::Current => snapshot
            .current_target
            .and_then(|id| snapshot.target(id))
            .filter(|t| is_valid_target(def, t))
            .or_else(|| valid.min_by(|a, b| a.distance.total_cmp(&b.distance))),
        TargetStrategy::Nearest => valid.min_by(|a, b| a.distance.total_cmp(&b.distance)),
        TargetStrategy::Furthest => valid.max_by(|a, b| a.distance.total_cmp(&b.distance)),
        TargetStrategy::LowestHealth => {
            valid.min_by(|a, b| a.health_ratio.total_cmp(&b.health_ratio))
        }
        TargetStrategy::HighestHealth => {
            valid.max_by(|a, b| a.health_ratio.total_cmp(&b.health_ratio))
        }
        TargetStrategy::SelfOnly => None,
    };
    picked.map(|t| Target::Entity(t.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionCatalog, Slot};
    use crate::config::TimingConfig;
    use crate::snapshot::{ActionState, StatusEffect};
    use crate::timing::CycleClock;

    const MANA: ResourceId = ResourceId(1);
    const SWIFT: StatusId = StatusId(10);
    const SILENCE: StatusId = StatusId(11);

    fn catalog() -> ActionCatalog {
        let mut catalog = ActionCatalog::new();
        catalog
            .insert(
                ActionDef::new(ActionId(1), "Nuke", Slot::Main)
                    .cost(MANA, 20.0)
                    .targets(TargetKind::Hostile, 25.0)
                    .cast_time(2.0)
                    .instant_with(SWIFT)
                    .forbids(SILENCE),
            )
            .expect("insert");
        catalog
            .insert(
                ActionDef::new(ActionId(2), "Dash", Slot::Weave)
                    .recast(30.0, 2)
                    .level(10),
            )
            .expect("insert");
        catalog
            .insert(ActionDef::new(ActionId(3), "Heal", Slot::Main).targets(TargetKind::Friendly, 30.0))
            .expect("insert");
        catalog
    }

    fn check(snapshot: &Snapshot, request: UseRequest) -> Result<Target, Denial> {
        check_with(snapshot, request, &ActionOverrides::default())
    }

    fn check_with(snapshot: &Snapshot, request: UseRequest, overrides: &ActionOverrides) -> Result<Target, Denial> {
        let clock = CycleClock::new(2.5, &TimingConfig::default());
        let catalog = catalog();
        let scope = EvalScope::new(&catalog, snapshot, &clock);
        can_use(overrides, &request, &scope)
    }

    fn caster() -> crate::snapshot::SnapshotBuilder {
        Snapshot::builder()
            .level(50)
            .resource(MANA, 100.0, 100.0)
            .action(ActionId(1), ActionState::ready(0.0).with_cast_time(2.0))
            .action(ActionId(2), ActionState::ready(30.0).with_charges(2, 2))
            .target(TargetState::hostile(TargetId(7), 10.0))
    }

    #[test]
    fn binds_hostile_target() {
        let snapshot = caster().build();
        assert_eq!(
            check(&snapshot, UseRequest::new(ActionId(1))),
            Ok(Target::Entity(TargetId(7)))
        );
    }

    #[test]
    fn denies_unaffordable_cost() {
        let snapshot = caster().resource(MANA, 10.0, 100.0).build();
        assert!(matches!(
            check(&snapshot, UseRequest::new(ActionId(1))),
            Err(Denial::InsufficientResource { .. })
        ));
    }

    #[test]
    fn level_gate_runs_first() {
        let snapshot = caster().level(5).build();
        assert_eq!(
            check(&snapshot, UseRequest::new(ActionId(2))),
            Err(Denial::LevelTooLow {
                required: 10,
                level: 5
            })
        );
    }

    #[test]
    fn reserve_keeps_last_charge() {
        let request = UseRequest {
            reserve_charge: true,
            ..UseRequest::new(ActionId(2))
        };
        let capped = caster().build();
        let one_left = caster()
            .action(ActionId(2), ActionState::cooling(10.0, 30.0).with_charges(1, 2))
            .build();

        assert_eq!(check(&capped, request), Ok(Target::Actor));
        assert_eq!(check(&one_left, request), Err(Denial::ChargeReserved));
        assert_eq!(check(&one_left, UseRequest::new(ActionId(2))), Ok(Target::Actor));
    }

    #[test]
    fn cast_while_moving_needs_instant_status() {
        let moving = caster().moving(true).build();
        let swift = caster()
            .moving(true)
            .status(StatusEffect::new(SWIFT, 10.0))
            .build();

        assert_eq!(check(&moving, UseRequest::new(ActionId(1))), Err(Denial::CastWhileMoving));
        assert!(check(&swift, UseRequest::new(ActionId(1))).is_ok());
    }

    #[test]
    fn forbidden_status_blocks() {
        let snapshot = caster().status(StatusEffect::new(SILENCE, 5.0)).build();
        assert_eq!(
            check(&snapshot, UseRequest::new(ActionId(1))),
            Err(Denial::ForbiddenStatus(SILENCE))
        );
    }

    #[test]
    fn out_of_range_target_is_invalid() {
        let snapshot = Snapshot::builder()
            .resource(MANA, 100.0, 100.0)
            .target(TargetState::hostile(TargetId(7), 40.0))
            .build();
        assert_eq!(check(&snapshot, UseRequest::new(ActionId(1))), Err(Denial::NoValidTarget));
    }

    #[test]
    fn strategies_pick_deterministically() {
        let snapshot = caster()
            .target(TargetState::hostile(TargetId(8), 20.0).with_health(0.2))
            .target(TargetState::hostile(TargetId(9), 5.0).with_health(0.9))
            .build();
        let pick = |strategy| {
            check(
                &snapshot,
                UseRequest {
                    strategy,
                    ..UseRequest::new(ActionId(1))
                },
            )
        };

        assert_eq!(pick(TargetStrategy::Nearest), Ok(Target::Entity(TargetId(9))));
        assert_eq!(pick(TargetStrategy::Furthest), Ok(Target::Entity(TargetId(8))));
        assert_eq!(pick(TargetStrategy::LowestHealth), Ok(Target::Entity(TargetId(8))));
        assert_eq!(pick(TargetStrategy::Current), Ok(Target::Entity(TargetId(9))));
        assert_eq!(pick(TargetStrategy::SelfOnly), Err(Denial::NoValidTarget));
    }

    #[test]
    fn self_only_heal() {
        let snapshot = caster().build();
        let request = UseRequest {
            strategy: TargetStrategy::SelfOnly,
            ..UseRequest::new(ActionId(3))
        };
        assert_eq!(check(&snapshot, request), Ok(Target::Actor));
        assert_eq!(check(&snapshot, UseRequest::new(ActionId(3))), Err(Denial::NoValidTarget));
    }

    #[test]
    fn overrides_disable_and_guard() {
        let snapshot = caster().build();
        let mut overrides = ActionOverrides::default();
        overrides.disabled.insert(ActionId(2));
        overrides.guards.insert(ActionId(1), Condition::InCombat);

        assert_eq!(
            check_with(&snapshot, UseRequest::new(ActionId(2)), &overrides),
            Err(Denial::Disabled)
        );
        assert_eq!(
            check_with(&snapshot, UseRequest::new(ActionId(1)), &overrides),
            Err(Denial::ActionGuard)
        );
    }
}
