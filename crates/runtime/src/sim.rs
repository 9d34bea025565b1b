//! Deterministic world model.
//!
//! [`World`] is a small, fully deterministic stand-in for the game: one
//! actor with resource pools, action charges, status timers and cycle/cast/
//! lock timers, plus an optional single hostile target. It produces
//! [`Snapshot`]s and applies decisions, re-validating each action with the
//! same usability gate the engine uses.
//!
//! [`Simulator`] shares a world behind an async mutex and implements both
//! [`SnapshotProvider`] and [`Executor`] for the frame loop.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use rotation_core::{
    ActionCatalog, ActionDef, ActionId, ActionOverrides, ActionState, ArchetypeProfile, CycleClock,
    DecisionOutput, Denial, EvalScope, Haste, Mode, ResourceId, ResourcePool, Selected, Slot, Snapshot,
    StatusEffect, Target, TargetId, TargetState, TimingConfig, UseRequest, can_use,
    usability::is_valid_target,
};

use crate::api::{ExecutionReport, Executor, Result, SnapshotProvider};

/// Initial state and rates of a simulated world.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Unhasted cycle length; regeneration is expressed per cycle of this length.
    pub cycle_length: f32,
    pub haste: Vec<Haste>,
    pub level: u32,
    pub resources: Vec<SimResource>,
    /// Distance of the hostile target; `None` for a world without targets.
    pub target_distance: Option<f32>,
    /// Health fraction removed from the target per main action; zero keeps it alive.
    pub damage_per_main: f32,
    /// Pre-combat countdown. Combat starts when it runs out.
    pub countdown: Option<f32>,
    pub moving: bool,
    /// Host modes reported in every snapshot.
    pub modes: BTreeSet<Mode>,
    /// Seconds the world advances between snapshots served by [`Simulator`].
    pub step: f32,
}

/// One resource pool with its regeneration rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimResource {
    pub id: ResourceId,
    pub current: f32,
    pub max: f32,
    pub regen_per_cycle: f32,
}

impl SimConfig {
    pub const TARGET: TargetId = TargetId(1);

    /// A world with one hostile target in range, paced by `profile`.
    pub fn for_profile(profile: &ArchetypeProfile) -> Self {
        Self {
            cycle_length: profile.base_cycle_length,
            haste: profile.haste.clone(),
            ..Self::default()
        }
    }

    pub fn resource(mut self, id: ResourceId, current: f32, max: f32, regen_per_cycle: f32) -> Self {
        self.resources.push(SimResource {
            id,
            current,
            max,
            regen_per_cycle,
        });
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn countdown(mut self, seconds: f32) -> Self {
        self.countdown = Some(seconds);
        self
    }

    pub fn without_target(mut self) -> Self {
        self.target_distance = None;
        self
    }

    pub fn damage_per_main(mut self, fraction: f32) -> Self {
        self.damage_per_main = fraction;
        self
    }

    pub fn step(mut self, seconds: f32) -> Self {
        self.step = seconds;
        self
    }

    /// Replaces the reported modes.
    pub fn modes(mut self, modes: impl IntoIterator<Item = Mode>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cycle_length: 2.5,
            haste: Vec::new(),
            level: 100,
            resources: Vec::new(),
            target_distance: Some(3.0),
            damage_per_main: 0.0,
            countdown: None,
            moving: false,
            modes: BTreeSet::from([Mode::Burst]),
            step: 0.25,
        }
    }
}

/// Mutable world state.
pub struct World {
    catalog: Arc<ActionCatalog>,
    config: SimConfig,
    clock: CycleClock,

    time: f32,
    resources: BTreeMap<ResourceId, ResourcePool>,
    regen: BTreeMap<ResourceId, f32>,
    /// Cooldown state for actions that have a recast or several charges.
    cooldowns: BTreeMap<ActionId, ActionState>,
    statuses: Vec<StatusEffect>,
    target: Option<TargetState>,

    countdown: Option<f32>,
    in_combat: bool,
    combat_elapsed: f32,
    moving: bool,
    main_recast: f32,
    cast: f32,
    lock: f32,
}

impl World {
    pub fn new(catalog: Arc<ActionCatalog>, config: SimConfig) -> Self {
        let resources = config
            .resources
            .iter()
            .map(|r| (r.id, ResourcePool::new(r.current, r.max)))
            .collect();
        let regen = config
            .resources
            .iter()
            .map(|r| (r.id, r.regen_per_cycle))
            .collect();
        let cooldowns = catalog
            .iter()
            .filter(|def| def.recast > 0.0 || def.max_charges > 1)
            .map(|def| {
                let state = ActionState::ready(def.recast)
                    .with_charges(def.max_charges, def.max_charges)
                    .with_cast_time(def.cast_time);
                (def.id, state)
            })
            .collect();
        let target = config
            .target_distance
            .map(|distance| TargetState::hostile(SimConfig::TARGET, distance));
        let clock = CycleClock::new(config.cycle_length, &TimingConfig::default());

        Self {
            catalog,
            clock,
            time: 0.0,
            resources,
            regen,
            cooldowns,
            statuses: Vec::new(),
            target,
            countdown: config.countdown,
            in_combat: false,
            combat_elapsed: 0.0,
            moving: config.moving,
            main_recast: 0.0,
            cast: 0.0,
            lock: 0.0,
            config,
        }
    }

    /// Seconds simulated so far.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn resource(&self, id: ResourceId) -> Option<f32> {
        self.resources.get(&id).map(|p| p.current)
    }

    pub fn target_health(&self) -> Option<f32> {
        self.target.as_ref().map(|t| t.health_ratio)
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    /// Builds the snapshot for the current instant.
    pub fn snapshot(&self) -> Snapshot {
        let mut builder = Snapshot::builder()
            .level(self.config.level)
            .moving(self.moving)
            .main_recast(self.main_recast)
            .casting(self.cast)
            .animation_lock(self.lock);

        for (id, pool) in &self.resources {
            builder = builder.resource(*id, pool.current, pool.max);
        }
        for status in &self.statuses {
            builder = builder.status(*status);
        }
        for (id, state) in &self.cooldowns {
            builder = builder.action(*id, *state);
        }
        if let Some(target) = self.target.as_ref().filter(|t| t.is_alive()) {
            builder = builder.target(target.clone()).current_target(target.id);
        }
        if self.in_combat {
            builder = builder.in_combat(self.combat_elapsed);
        }
        if let Some(remaining) = self.countdown {
            builder = builder.countdown(remaining);
        }
        for mode in &self.config.modes {
            builder = builder.mode(*mode);
        }
        builder.build()
    }

    /// Moves time forward by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        self.time += dt;

        if let Some(remaining) = self.countdown {
            let left = remaining - dt;
            if left > 0.0 {
                self.countdown = Some(left);
            } else {
                self.countdown = None;
                self.start_combat();
            }
        } else if self.in_combat {
            self.combat_elapsed += dt;
        }

        let cycle = self.config.cycle_length.max(f32::EPSILON);
        for (id, pool) in self.resources.iter_mut() {
            let per_cycle = self.regen.get(id).copied().unwrap_or(0.0);
            pool.current = (pool.current + per_cycle * dt / cycle).clamp(0.0, pool.max);
        }

        self.main_recast = (self.main_recast - dt).max(0.0);
        self.cast = (self.cast - dt).max(0.0);
        self.lock = (self.lock - dt).max(0.0);

        for state in self.cooldowns.values_mut() {
            recover_charges(state, dt);
        }

        for status in self.statuses.iter_mut() {
            status.remaining -= dt;
        }
        self.statuses.retain(StatusEffect::is_active);
    }

    /// Applies a decision, main action first.
    ///
    /// Every action is re-checked against the world as it is at commit time,
    /// including the effects of actions committed just before it.
    pub fn commit(&mut self, decision: &DecisionOutput) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        for (slot, selected) in decision.iter() {
            match self.validate(selected) {
                Ok(()) => {
                    self.apply(slot, selected);
                    report.committed.push((slot, *selected));
                }
                Err(reason) => {
                    debug!(action = %selected.action, %reason, "stale action rejected");
                    report.rejected.push((*selected, reason));
                }
            }
        }
        report
    }

    fn validate(&mut self, selected: &Selected) -> std::result::Result<(), Denial> {
        let snapshot = self.snapshot();
        self.clock.refresh(&snapshot, &self.config.haste);
        let scope = EvalScope::new(&self.catalog, &snapshot, &self.clock);
        can_use(
            &ActionOverrides::default(),
            &UseRequest::new(selected.action),
            &scope,
        )?;

        match selected.target {
            Target::Actor => Ok(()),
            Target::Entity(id) => {
                let def = self.catalog.get(selected.action).ok_or(Denial::UnknownAction)?;
                match snapshot.target(id) {
                    Some(target) if is_valid_target(def, target) => Ok(()),
                    _ => Err(Denial::NoValidTarget),
                }
            }
        }
    }

    fn apply(&mut self, slot: Slot, selected: &Selected) {
        let Some(def) = self.catalog.get(selected.action).cloned() else {
            return;
        };

        for cost in &def.costs {
            if let Some(pool) = self.resources.get_mut(&cost.resource) {
                pool.current = (pool.current - cost.amount).max(0.0);
            }
        }
        for gain in &def.gains {
            if let Some(pool) = self.resources.get_mut(&gain.resource) {
                pool.current = (pool.current + gain.amount).min(pool.max);
            }
        }

        if let Some(state) = self.cooldowns.get_mut(&def.id) {
            state.charges = state.charges.saturating_sub(1);
            if state.recast_remaining <= 0.0 {
                state.recast_remaining = state.recast_interval;
            }
        }

        self.lock += def.lock_time;
        if slot == Slot::Main {
            let cast = self.cast_time(&def);
            self.cast = self.cast.max(cast);
            self.main_recast = self.current_cycle_length().max(cast);
        }

        for grant in &def.applies {
            self.statuses.retain(|s| s.id != grant.status);
            self.statuses.push(StatusEffect::new(grant.status, grant.duration));
        }

        if let Target::Entity(_) = selected.target {
            if !self.in_combat && self.countdown.is_none() {
                self.start_combat();
            }
            if slot == Slot::Main {
                self.damage_target();
            }
        }
    }

    /// Cast time of `def`, consuming an instant-cast status if one applies.
    fn cast_time(&mut self, def: &ActionDef) -> f32 {
        if def.cast_time <= 0.0 {
            return 0.0;
        }
        let instant = def
            .instant_with
            .iter()
            .copied()
            .find(|s| self.statuses.iter().any(|e| e.id == *s && e.is_active()));
        match instant {
            Some(status) => {
                self.statuses.retain(|e| e.id != status);
                0.0
            }
            None => def.cast_time,
        }
    }

    fn current_cycle_length(&self) -> f32 {
        let percent: f32 = self
            .config
            .haste
            .iter()
            .filter(|h| self.statuses.iter().any(|s| s.id == h.status && s.is_active()))
            .map(|h| h.percent)
            .sum();
        (self.config.cycle_length * (1.0 - percent / 100.0)).max(TimingConfig::DEFAULT_MIN_CYCLE_LENGTH)
    }

    fn damage_target(&mut self) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        if self.config.damage_per_main <= 0.0 {
            return;
        }
        target.health_ratio = (target.health_ratio - self.config.damage_per_main).max(0.0);
        if !target.is_alive() {
            debug!(target = %target.id, "target defeated");
            self.in_combat = false;
            self.combat_elapsed = 0.0;
        }
    }

    fn start_combat(&mut self) {
        self.in_combat = true;
        self.combat_elapsed = 0.0;
    }
}

fn recover_charges(state: &mut ActionState, dt: f32) {
    if state.charges >= state.max_charges {
        state.recast_remaining = 0.0;
        return;
    }
    state.recast_remaining -= dt;
    while state.recast_remaining <= 0.0 && state.charges < state.max_charges {
        state.charges += 1;
        if state.charges < state.max_charges && state.recast_interval > 0.0 {
            state.recast_remaining += state.recast_interval;
        } else {
            state.recast_remaining = 0.0;
        }
    }
}

/// Async façade over a shared [`World`].
///
/// Each snapshot after the first advances the world by [`SimConfig::step`].
#[derive(Clone)]
pub struct Simulator {
    world: Arc<Mutex<World>>,
    step: f32,
    started: Arc<std::sync::atomic::AtomicBool>,
}

impl Simulator {
    pub fn new(catalog: Arc<ActionCatalog>, config: SimConfig) -> Self {
        let step = config.step;
        Self {
            world: Arc::new(Mutex::new(World::new(catalog, config))),
            step,
            started: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Shared access to the world, e.g. to inspect it after a run.
    pub fn world(&self) -> &Arc<Mutex<World>> {
        &self.world
    }
}

#[async_trait]
impl SnapshotProvider for Simulator {
    async fn snapshot(&self) -> Result<Snapshot> {
        let mut world = self.world.lock().await;
        if self.started.swap(true, std::sync::atomic::Ordering::SeqCst) {
            world.advance(self.step);
        }
        Ok(world.snapshot())
    }
}

#[async_trait]
impl Executor for Simulator {
    async fn execute(&self, decision: &DecisionOutput) -> Result<ExecutionReport> {
        Ok(self.world.lock().await.commit(decision))
    }
}
