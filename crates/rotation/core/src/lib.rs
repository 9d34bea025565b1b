//! Deterministic decision model for real-time priority action scheduling.
//!
//! `rotation-core` defines the data the solver reasons about (snapshots,
//! action catalogs, rule cascades) and the pure logic over it: predicates,
//! the CanUse gate and the cycle clock. It never logs or performs I/O; the
//! tick-driven engine that walks a cascade lives in the `runtime` crate.
pub mod cascade;
pub mod catalog;
pub mod condition;
pub mod config;
pub mod decision;
pub mod error;
pub mod ids;
pub mod predicates;
pub mod snapshot;
pub mod timing;
pub mod usability;

pub use cascade::{
    ActionGuardSpec, ArchetypeProfile, CascadeSpec, ClassKind, ClassSpec, HasteSpec, Rule,
    RuleCascade, RuleSpec, UrgencyClass,
};
pub use catalog::{
    ActionCatalog, ActionCatalogSpec, ActionDef, ActionSpec, ResourceAmount, ResourceSpec, Slot,
    StatusGrant, StatusSpec, TargetKind,
};
pub use condition::{Condition, ConditionSpec, CustomGuard, EvalScope, GuardFn, GuardRegistry};
pub use config::{BusConfig, EngineConfig, FrameConfig, SolverConfig, TimingConfig};
pub use decision::{DecisionOutput, Selected};
pub use error::{CascadeError, CatalogError, ConditionFault, ErrorSeverity, RotationError};
pub use ids::{ActionId, ResourceId, StatusId, TargetId};
pub use predicates::{Cmp, Subject};
pub use snapshot::{
    ActionState, ActorState, Mode, Position, ResourcePool, Snapshot, SnapshotBuilder, StatusEffect,
    TargetState,
};
pub use timing::{CombatEdge, CommittedAction, CycleClock, Haste, WeaveWindow};
pub use usability::{
    ActionOverrides, Denial, Target, TargetStrategy, UseRequest, can_use, select_target,
};
