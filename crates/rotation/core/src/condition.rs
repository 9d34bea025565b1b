//! Rule guards.
//!
//! A [`Condition`] is a tree of predicates over the snapshot and cycle clock
//! with ids already resolved. Content files write the name-based
//! [`ConditionSpec`] form, which is compiled against an action catalog and a
//! [`GuardRegistry`] when a cascade is loaded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::cascade::Resolver;
use crate::catalog::ActionCatalog;
use crate::error::{CascadeError, ConditionFault};
use crate::ids::{ActionId, ResourceId, StatusId};
use crate::predicates::{self, Cmp, Subject};
use crate::snapshot::{Mode, Snapshot, TargetState};
use crate::timing::{CycleClock, WeaveWindow};

/// Everything a guard may read during one tick.
#[derive(Clone, Copy, Debug)]
pub struct EvalScope<'a> {
    pub catalog: &'a ActionCatalog,
    pub snapshot: &'a Snapshot,
    pub clock: &'a CycleClock,
    /// The entity target-facing guards look at.
    pub target: Option<&'a TargetState>,
}

impl<'a> EvalScope<'a> {
    pub fn new(catalog: &'a ActionCatalog, snapshot: &'a Snapshot, clock: &'a CycleClock) -> Self {
        Self {
            catalog,
            snapshot,
            clock,
            target: predicates::focus_target(snapshot),
        }
    }
}

/// Signature of a user-supplied guard.
pub type GuardFn = dyn Fn(&EvalScope<'_>) -> Result<bool, String> + Send + Sync;

/// A named custom guard bound into a compiled condition.
#[derive(Clone)]
pub struct CustomGuard {
    name: String,
    guard: Arc<GuardFn>,
}

impl CustomGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, scope: &EvalScope<'_>) -> Result<bool, ConditionFault> {
        (self.guard)(scope).map_err(|message| ConditionFault::Guard {
            name: self.name.clone(),
            message,
        })
    }
}

impl fmt::Debug for CustomGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomGuard").field(&self.name).finish()
    }
}

/// Custom guards available to cascades, keyed by name.
#[derive(Clone, Default)]
pub struct GuardRegistry {
    guards: BTreeMap<String, Arc<GuardFn>>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a guard, replacing any previous guard with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, guard: F) -> &mut Self
    where
        F: Fn(&EvalScope<'_>) -> Result<bool, String> + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Arc::new(guard));
        self
    }

    pub fn get(&self, name: &str) -> Option<CustomGuard> {
        self.guards.get(name).map(|guard| CustomGuard {
            name: name.to_string(),
            guard: Arc::clone(guard),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.guards.keys().map(String::as_str)
    }
}

impl fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.guards.keys()).finish()
    }
}

/// A compiled guard.
#[derive(Clone, Debug)]
pub enum Condition {
    Always,
    Never,
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),

    Resource {
        resource: ResourceId,
        cmp: Cmp,
        value: f32,
    },
    StatusActive {
        on: Subject,
        status: StatusId,
    },
    /// Active and expiring within `cycles` cycles plus `tolerance` seconds.
    StatusEndingSoon {
        on: Subject,
        status: StatusId,
        cycles: f32,
        tolerance: f32,
    },
    /// Active and not expiring within `cycles` cycles plus `tolerance` seconds.
    StatusHolding {
        on: Subject,
        status: StatusId,
        cycles: f32,
        tolerance: f32,
    },
    StatusStacks {
        on: Subject,
        status: StatusId,
        cmp: Cmp,
        stacks: u8,
    },
    TargetDistance {
        cmp: Cmp,
        value: f32,
    },
    TargetHealth {
        cmp: Cmp,
        ratio: f32,
    },
    HostilesInRange {
        range: f32,
        cmp: Cmp,
        count: u32,
    },

    HasCharge(ActionId),
    ChargeAfterCycles {
        action: ActionId,
        cycles: u32,
    },
    ChargeAfterSeconds {
        action: ActionId,
        seconds: f32,
    },
    ChargesAfterCycles {
        action: ActionId,
        charges: u8,
        cycles: u32,
    },

    InCombat,
    Moving,
    /// The host has switched this mode on.
    Mode(Mode),
    CombatTime {
        cmp: Cmp,
        seconds: f32,
    },
    CycleRemaining {
        cmp: Cmp,
        seconds: f32,
    },
    WeaveWindow(WeaveWindow),
    Countdown {
        cmp: Cmp,
        seconds: f32,
    },

    LastMainAction(Vec<ActionId>),
    LastWeave(Vec<ActionId>),
    MainActionsSinceCombatStart {
        cmp: Cmp,
        count: u32,
    },

    Custom(CustomGuard),
}

impl Condition {
    /// Evaluates the guard.
    ///
    /// Combinators short-circuit left to right. A fault anywhere in the tree
    /// makes the whole guard fault; it is never read as `false`.
    pub fn evaluate(&self, scope: &EvalScope<'_>) -> Result<bool, ConditionFault> {
        let snapshot = scope.snapshot;
        let clock = scope.clock;

        Ok(match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::All(children) => {
                for child in children {
                    if !child.evaluate(scope)? {
                        return Ok(false);
                    }
                }
                true
            }
            Condition::Any(children) => {
                for child in children {
                    if child.evaluate(scope)? {
                        return Ok(true);
                    }
                }
                false
            }
            Condition::Not(inner) => !inner.evaluate(scope)?,

            Condition::Resource {
                resource,
                cmp,
                value,
            } => predicates::resource_compare(snapshot, *resource, *cmp, *value)?,
            Condition::StatusActive { on, status } => {
                predicates::subject_status(snapshot, scope.target, *on, *status).is_some()
            }
            Condition::StatusEndingSoon {
                on,
                status,
                cycles,
                tolerance,
            } => clock.status_ending_within(
                predicates::subject_status(snapshot, scope.target, *on, *status),
                *cycles,
                *tolerance,
            ),
            Condition::StatusHolding {
                on,
                status,
                cycles,
                tolerance,
            } => predicates::status_active_and_holding(
                clock,
                predicates::subject_status(snapshot, scope.target, *on, *status),
                *cycles,
                *tolerance,
            ),
            Condition::StatusStacks {
                on,
                status,
                cmp,
                stacks,
            } => {
                let current = predicates::subject_status(snapshot, scope.target, *on, *status)
                    .map_or(0, |s| s.stacks);
                cmp.apply_count(u32::from(current), u32::from(*stacks))
            }
            Condition::TargetDistance { cmp, value } => {
                predicates::target_distance(scope.target).is_some_and(|d| cmp.apply(d, *value))
            }
            Condition::TargetHealth { cmp, ratio } => match scope.target {
                Some(target) => cmp.apply(predicates::finite(target.health_ratio, "health")?, *ratio),
                None => false,
            },
            Condition::HostilesInRange { range, cmp, count } => {
                cmp.apply_count(predicates::hostiles_in_range(snapshot, *range), *count)
            }

            Condition::HasCharge(action) => {
                predicates::action_state(scope.catalog, snapshot, *action)?.has_charge()
            }
            Condition::ChargeAfterCycles { action, cycles } => clock.will_have_charge_after_cycles(
                &predicates::action_state(scope.catalog, snapshot, *action)?,
                *cycles,
            ),
            Condition::ChargeAfterSeconds { action, seconds } => clock
                .will_have_charge_after_seconds(
                    &predicates::action_state(scope.catalog, snapshot, *action)?,
                    *seconds,
                ),
            Condition::ChargesAfterCycles {
                action,
                charges,
                cycles,
            } => clock.will_have_charges_after_cycles(
                &predicates::action_state(scope.catalog, snapshot, *action)?,
                *charges,
                *cycles,
            ),

            Condition::InCombat => snapshot.actor.in_combat,
            Condition::Moving => snapshot.actor.moving,
            Condition::Mode(mode) => snapshot.mode(*mode),
            Condition::CombatTime { cmp, seconds } => cmp.apply(clock.combat_elapsed(), *seconds),
            Condition::CycleRemaining { cmp, seconds } => cmp.apply(clock.cycle_remaining(), *seconds),
            Condition::WeaveWindow(window) => clock.weave_window() == *window,
            Condition::Countdown { cmp, seconds } => match snapshot.countdown {
                Some(remaining) if remaining > 0.0 => {
                    cmp.apply(predicates::finite(remaining, "countdown")?, *seconds)
                }
                _ => false,
            },

            Condition::LastMainAction(actions) => clock
                .last_main()
                .is_some_and(|last| actions.contains(&last)),
            Condition::LastWeave(actions) => clock
                .last_weave()
                .is_some_and(|last| actions.contains(&last)),
            Condition::MainActionsSinceCombatStart { cmp, count } => {
                cmp.apply_count(clock.main_actions_since_combat_start(), *count)
            }

            Condition::Custom(guard) => guard.call(scope)?,
        })
    }

    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }
}

// ============================================================================
// Name-based document form
// ============================================================================

/// Guard as written in content files, referring to things by name.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionSpec {
    Always,
    Never,
    All(Vec<ConditionSpec>),
    Any(Vec<ConditionSpec>),
    Not(Box<ConditionSpec>),

    Resource {
        resource: String,
        cmp: Cmp,
        value: f32,
    },
    StatusActive {
        #[cfg_attr(feature = "serde", serde(default))]
        on: Subject,
        status: String,
    },
    StatusEndingSoon {
        #[cfg_attr(feature = "serde", serde(default))]
        on: Subject,
        status: String,
        cycles: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        tolerance: f32,
    },
    StatusHolding {
        #[cfg_attr(feature = "serde", serde(default))]
        on: Subject,
        status: String,
        cycles: f32,
        #[cfg_attr(feature = "serde", serde(default))]
        tolerance: f32,
    },
    StatusStacks {
        #[cfg_attr(feature = "serde", serde(default))]
        on: Subject,
        status: String,
        cmp: Cmp,
        stacks: u8,
    },
    TargetDistance {
        cmp: Cmp,
        value: f32,
    },
    TargetHealth {
        cmp: Cmp,
        ratio: f32,
    },
    HostilesInRange {
        range: f32,
        cmp: Cmp,
        count: u32,
    },

    HasCharge(String),
    ChargeAfterCycles {
        action: String,
        cycles: u32,
    },
    ChargeAfterSeconds {
        action: String,
        seconds: f32,
    },
    ChargesAfterCycles {
        action: String,
        charges: u8,
        cycles: u32,
    },

    InCombat,
    Moving,
    Mode(Mode),
    CombatTime {
        cmp: Cmp,
        seconds: f32,
    },
    CycleRemaining {
        cmp: Cmp,
        seconds: f32,
    },
    WeaveWindow(WeaveWindow),
    Countdown {
        cmp: Cmp,
        seconds: f32,
    },

    LastMainAction(Vec<String>),
    LastWeave(Vec<String>),
    MainActionsSinceCombatStart {
        cmp: Cmp,
        count: u32,
    },

    Custom(String),
}

impl ConditionSpec {
    pub(crate) fn compile(&self, r: &Resolver<'_>) -> Result<Condition, CascadeError> {
        let number = |value: f32, what: &str| -> Result<f32, CascadeError> {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(r.invalid(format!("{what} must be finite")))
            }
        };
        let non_negative = |value: f32, what: &str| -> Result<f32, CascadeError> {
            let value = number(value, what)?;
            if value < 0.0 {
                Err(r.invalid(format!("{what} must not be negative")))
            } else {
                Ok(value)
            }
        };
        let actions = |names: &[String]| {
            names
                .iter()
                .map(|n| r.action(n))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(match self {
            ConditionSpec::Always => Condition::Always,
            ConditionSpec::Never => Condition::Never,
            ConditionSpec::All(children) => Condition::All(
                children
                    .iter()
                    .map(|c| c.compile(r))
                    .collect::<Result<_, _>>()?,
            ),
            ConditionSpec::Any(children) => Condition::Any(
                children
                    .iter()
                    .map(|c| c.compile(r))
                    .collect::<Result<_, _>>()?,
            ),
            ConditionSpec::Not(inner) => Condition::Not(Box::new(inner.compile(r)?)),

            ConditionSpec::Resource {
                resource,
                cmp,
                value,
            } => Condition::Resource {
                resource: r.resource(resource)?,
                cmp: *cmp,
                value: number(*value, "resource threshold")?,
            },
            ConditionSpec::StatusActive { on, status } => Condition::StatusActive {
                on: *on,
                status: r.status(status)?,
            },
            ConditionSpec::StatusEndingSoon {
                on,
                status,
                cycles,
                tolerance,
            } => Condition::StatusEndingSoon {
                on: *on,
                status: r.status(status)?,
                cycles: non_negative(*cycles, "lookahead cycles")?,
                tolerance: non_negative(*tolerance, "tolerance")?,
            },
            ConditionSpec::StatusHolding {
                on,
                status,
                cycles,
                tolerance,
            } => Condition::StatusHolding {
                on: *on,
                status: r.status(status)?,
                cycles: non_negative(*cycles, "lookahead cycles")?,
                tolerance: non_negative(*tolerance, "tolerance")?,
            },
            ConditionSpec::StatusStacks {
                on,
                status,
                cmp,
                stacks,
            } => Condition::StatusStacks {
                on: *on,
                status: r.status(status)?,
                cmp: *cmp,
                stacks: *stacks,
            },
            ConditionSpec::TargetDistance { cmp, value } => Condition::TargetDistance {
                cmp: *cmp,
                value: non_negative(*value, "distance")?,
            },
            ConditionSpec::TargetHealth { cmp, ratio } => Condition::TargetHealth {
                cmp: *cmp,
                ratio: non_negative(*ratio, "health ratio")?,
            },
            ConditionSpec::HostilesInRange { range, cmp, count } => Condition::HostilesInRange {
                range: non_negative(*range, "range")?,
                cmp: *cmp,
                count: *count,
            },

            ConditionSpec::HasCharge(action) => Condition::HasCharge(r.action(action)?),
            ConditionSpec::ChargeAfterCycles { action, cycles } => Condition::ChargeAfterCycles {
                action: r.action(action)?,
                cycles: *cycles,
            },
            ConditionSpec::ChargeAfterSeconds { action, seconds } => {
                Condition::ChargeAfterSeconds {
                    action: r.action(action)?,
                    seconds: non_negative(*seconds, "lookahead seconds")?,
                }
            }
            ConditionSpec::ChargesAfterCycles {
                action,
                charges,
                cycles,
            } => Condition::ChargesAfterCycles {
                action: r.action(action)?,
                charges: *charges,
                cycles: *cycles,
            },

            ConditionSpec::InCombat => Condition::InCombat,
            ConditionSpec::Moving => Condition::Moving,
            ConditionSpec::Mode(mode) => Condition::Mode(*mode),
            ConditionSpec::CombatTime { cmp, seconds } => Condition::CombatTime {
                cmp: *cmp,
                seconds: number(*seconds, "combat time")?,
            },
            ConditionSpec::CycleRemaining { cmp, seconds } => Condition::CycleRemaining {
                cmp: *cmp,
                seconds: number(*seconds, "cycle remaining")?,
            },
            ConditionSpec::WeaveWindow(window) => Condition::WeaveWindow(*window),
            ConditionSpec::Countdown { cmp, seconds } => Condition::Countdown {
                cmp: *cmp,
                seconds: number(*seconds, "countdown")?,
            },

            ConditionSpec::LastMainAction(names) => Condition::LastMainAction(actions(names)?),
            ConditionSpec::LastWeave(names) => Condition::LastWeave(actions(names)?),
            ConditionSpec::MainActionsSinceCombatStart { cmp, count } => {
                Condition::MainActionsSinceCombatStart {
                    cmp: *cmp,
                    count: *count,
                }
            }

            ConditionSpec::Custom(name) => Condition::Custom(r.guard(name)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDef, Slot};
    use crate::config::TimingConfig;
    use crate::ids::TargetId;
    use crate::snapshot::{ActionState, StatusEffect};

    fn clock() -> CycleClock {
        CycleClock::new(2.5, &TimingConfig::default())
    }

    #[test]
    fn combinators_short_circuit() {
        let snapshot = Snapshot::default();
        let catalog = ActionCatalog::new();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        // The missing resource is never reached.
        let guarded = Condition::All(vec![
            Condition::Never,
            Condition::Resource {
                resource: ResourceId(1),
                cmp: Cmp::Ge,
                value: 1.0,
            },
        ]);
        assert_eq!(guarded.evaluate(&scope), Ok(false));

        let any = Condition::Any(vec![Condition::Always, Condition::HasCharge(ActionId(5))]);
        assert_eq!(any.evaluate(&scope), Ok(true));
    }

    #[test]
    fn fault_propagates_through_not() {
        let snapshot = Snapshot::default();
        let catalog = ActionCatalog::new();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        let guard = Condition::HasCharge(ActionId(5)).not();
        assert_eq!(
            guard.evaluate(&scope),
            Err(ConditionFault::MissingAction(ActionId(5)))
        );
    }

    #[test]
    fn target_statuses_follow_focus() {
        let snapshot = Snapshot::builder()
            .target(
                TargetState::hostile(TargetId(1), 5.0)
                    .with_status(StatusEffect::new(StatusId(4), 3.0)),
            )
            .build();
        let catalog = ActionCatalog::new();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        let on_target = Condition::StatusActive {
            on: Subject::Target,
            status: StatusId(4),
        };
        let on_actor = Condition::StatusActive {
            on: Subject::Actor,
            status: StatusId(4),
        };
        let ending = Condition::StatusEndingSoon {
            on: Subject::Target,
            status: StatusId(4),
            cycles: 1.0,
            tolerance: 0.5,
        };
        assert_eq!(on_target.evaluate(&scope), Ok(true));
        assert_eq!(on_actor.evaluate(&scope), Ok(false));
        assert_eq!(ending.evaluate(&scope), Ok(true));
    }

    #[test]
    fn custom_guard_error_is_a_fault() {
        let mut registry = GuardRegistry::new();
        registry.register("broken", |_| Err("no data".to_string()));
        let guard = Condition::Custom(registry.get("broken").expect("registered"));

        let snapshot = Snapshot::default();
        let catalog = ActionCatalog::new();
        let clock = clock();
        assert_eq!(
            guard.evaluate(&EvalScope::new(&catalog, &snapshot, &clock)),
            Err(ConditionFault::Guard {
                name: "broken".to_string(),
                message: "no data".to_string()
            })
        );
    }

    #[test]
    fn charge_projection_condition() {
        let snapshot = Snapshot::builder()
            .action(ActionId(2), ActionState::cooling(4.0, 60.0))
            .build();
        let catalog = ActionCatalog::new();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        let now = Condition::ChargeAfterCycles {
            action: ActionId(2),
            cycles: 0,
        };
        let soon = Condition::ChargeAfterCycles {
            action: ActionId(2),
            cycles: 2,
        };
        assert_eq!(now.evaluate(&scope), Ok(false));
        assert_eq!(soon.evaluate(&scope), Ok(true));
    }

    #[test]
    fn unreported_action_without_cooldown_is_ready() {
        let mut catalog = ActionCatalog::new();
        catalog
            .insert(ActionDef::new(ActionId(1), "Jab", Slot::Main))
            .expect("insert");
        catalog
            .insert(ActionDef::new(ActionId(2), "Burst", Slot::Weave).recast(60.0, 1))
            .expect("insert");
        let snapshot = Snapshot::default();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        assert_eq!(Condition::HasCharge(ActionId(1)).evaluate(&scope), Ok(true));
        let soon = Condition::ChargeAfterCycles {
            action: ActionId(1),
            cycles: 1,
        };
        assert_eq!(soon.evaluate(&scope), Ok(true));

        // A real cooldown the host forgot to report is still a fault.
        assert_eq!(
            Condition::HasCharge(ActionId(2)).evaluate(&scope),
            Err(ConditionFault::MissingAction(ActionId(2)))
        );
    }

    #[test]
    fn holding_status_needs_time_left() {
        let snapshot = Snapshot::builder()
            .status(StatusEffect::new(StatusId(1), 20.0))
            .status(StatusEffect::new(StatusId(2), 2.0))
            .build();
        let catalog = ActionCatalog::new();
        let clock = clock();
        let scope = EvalScope::new(&catalog, &snapshot, &clock);

        let holding = |status| Condition::StatusHolding {
            on: Subject::Actor,
            status,
            cycles: 1.0,
            tolerance: 0.0,
        };
        assert_eq!(holding(StatusId(1)).evaluate(&scope), Ok(true));
        assert_eq!(holding(StatusId(2)).evaluate(&scope), Ok(false));
        assert_eq!(holding(StatusId(3)).evaluate(&scope), Ok(false));
    }

    #[test]
    fn mode_follows_host_flags() {
        let catalog = ActionCatalog::new();
        let clock = clock();
        let burst = Snapshot::builder().mode(Mode::Burst).build();
        let quiet = Snapshot::default();

        let guard = Condition::Mode(Mode::Burst);
        assert_eq!(guard.evaluate(&EvalScope::new(&catalog, &burst, &clock)), Ok(true));
        assert_eq!(guard.evaluate(&EvalScope::new(&catalog, &quiet, &clock)), Ok(false));
    }
}
