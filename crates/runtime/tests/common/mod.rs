//! Shared fixtures for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use rotation_core::{
    ActionCatalog, ActionDef, ActionId, ActionOverrides, ArchetypeProfile, ClassKind, CycleClock,
    EngineConfig, ResourceId, Rule, RuleCascade, Slot, Snapshot, SnapshotBuilder, StatusId,
    TargetId, TargetKind, TargetState, TimingConfig, UrgencyClass,
};
use runtime::{Engine, TickOutcome};

pub const MANA: ResourceId = ResourceId(1);
pub const HASTE: StatusId = StatusId(1);

pub const NUKE: ActionId = ActionId(1);
pub const BOLT: ActionId = ActionId(2);
pub const MEND: ActionId = ActionId(3);
pub const FLARE: ActionId = ActionId(4);
pub const METEOR: ActionId = ActionId(5);
pub const BURST: ActionId = ActionId(10);
pub const SURGE: ActionId = ActionId(11);
pub const WARD: ActionId = ActionId(12);
pub const DASH: ActionId = ActionId(13);

pub const ENEMY: TargetId = TargetId(7);
pub const CYCLE: f32 = 2.5;

/// Main: Nuke (50 mana, hostile), Bolt (free, hostile), Mend (self),
/// Flare (2 s cast, hostile), Meteor (level 50, hostile).
/// Weave: Burst (60 s recast), Surge and Ward (no recast), Dash (two charges).
pub fn catalog() -> Arc<ActionCatalog> {
    let mut catalog = ActionCatalog::new();
    catalog.add_resource("mana", MANA).unwrap();
    catalog.add_status("Haste", HASTE).unwrap();

    let defs = [
        ActionDef::new(NUKE, "Nuke", Slot::Main)
            .cost(MANA, 50.0)
            .targets(TargetKind::Hostile, 25.0),
        ActionDef::new(BOLT, "Bolt", Slot::Main).targets(TargetKind::Hostile, 25.0),
        ActionDef::new(MEND, "Mend", Slot::Main),
        ActionDef::new(FLARE, "Flare", Slot::Main)
            .targets(TargetKind::Hostile, 25.0)
            .cast_time(2.0),
        ActionDef::new(METEOR, "Meteor", Slot::Main)
            .targets(TargetKind::Hostile, 25.0)
            .level(50),
        ActionDef::new(BURST, "Burst", Slot::Weave).recast(60.0, 1),
        ActionDef::new(SURGE, "Surge", Slot::Weave),
        ActionDef::new(WARD, "Ward", Slot::Weave),
        ActionDef::new(DASH, "Dash", Slot::Weave).recast(30.0, 2),
    ];
    for def in defs {
        catalog.insert(def).unwrap();
    }
    Arc::new(catalog)
}

/// In combat, full mana, one hostile in range and selected, all slots free.
pub fn ready() -> SnapshotBuilder {
    Snapshot::builder()
        .resource(MANA, 100.0, 100.0)
        .target(TargetState::hostile(ENEMY, 5.0))
        .current_target(ENEMY)
        .in_combat(30.0)
}

pub fn cascade(classes: Vec<UrgencyClass>, filler: ActionId) -> RuleCascade {
    cascade_with(classes, filler, ActionOverrides::default())
}

pub fn cascade_with(
    classes: Vec<UrgencyClass>,
    filler: ActionId,
    overrides: ActionOverrides,
) -> RuleCascade {
    RuleCascade::new(
        ArchetypeProfile::new("Fixture", CYCLE),
        classes,
        Rule::new("Filler", filler),
        overrides,
        &catalog(),
    )
    .unwrap()
}

pub fn main_class(rules: Vec<Rule>) -> UrgencyClass {
    UrgencyClass::new("main", ClassKind::Main, rules)
}

pub fn weave_class(name: &str, rules: Vec<Rule>) -> UrgencyClass {
    UrgencyClass::new(name, ClassKind::Weave, rules)
}

pub fn traced() -> EngineConfig {
    EngineConfig {
        trace: true,
        ..EngineConfig::default()
    }
}

pub fn engine(cascade: RuleCascade, config: EngineConfig) -> Engine {
    Engine::new(catalog(), Arc::new(cascade), config)
}

pub fn clock_for(snapshot: &Snapshot) -> CycleClock {
    let mut clock = CycleClock::new(CYCLE, &TimingConfig::default());
    clock.refresh(snapshot, &[]);
    clock
}

/// One tick with a fresh clock.
pub fn tick(engine: &Engine, snapshot: Snapshot) -> TickOutcome {
    let clock = clock_for(&snapshot);
    engine.tick(Arc::new(snapshot), &clock)
}
