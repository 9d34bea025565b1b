//! Solver session for one actor.
//!
//! [`Solver`] owns the only state that survives between ticks (the
//! [`CycleClock`]) and the active engine. Replacing the cascade takes
//! `&mut self`, so a reload can never land in the middle of a tick.

use std::sync::Arc;

use tracing::{debug, info};

use rotation_core::{
    ActionCatalog, ActionId, CombatEdge, CycleClock, DecisionOutput, RuleCascade, Slot, Snapshot,
    SolverConfig,
};

use crate::engine::{Engine, TickOutcome};
use crate::events::{DecisionEvent, Event, EventBus, SessionEvent};

pub struct Solver {
    engine: Engine,
    clock: CycleClock,
    config: SolverConfig,
    tick: u64,
    bus: Option<EventBus>,
}

impl Solver {
    /// Activates `cascade` for an actor.
    pub fn new(catalog: Arc<ActionCatalog>, cascade: RuleCascade, config: SolverConfig) -> Self {
        let cascade = Arc::new(cascade);
        let clock = CycleClock::new(cascade.profile().base_cycle_length, &config.timing);
        info!(
            archetype = cascade.archetype(),
            classes = cascade.classes().len(),
            rules = cascade.rule_count(),
            "cascade activated"
        );
        let engine = Engine::new(catalog, cascade, config.engine.clone());

        Self {
            engine,
            clock,
            config,
            tick: 0,
            bus: None,
        }
    }

    /// Publishes decisions, traces and session events on `bus`.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        bus.publish(Event::Session(SessionEvent::Activated {
            archetype: self.archetype().to_string(),
        }));
        self.bus = Some(bus);
        self
    }

    pub fn archetype(&self) -> &str {
        self.engine.cascade().archetype()
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        self.engine.catalog()
    }

    pub fn cascade(&self) -> &Arc<RuleCascade> {
        self.engine.cascade()
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Number of ticks evaluated so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Runs one tick and returns the decision.
    pub fn tick(&mut self, snapshot: impl Into<Arc<Snapshot>>) -> DecisionOutput {
        self.tick_traced(snapshot).decision
    }

    /// Runs one tick and returns the decision with its trace.
    pub fn tick_traced(&mut self, snapshot: impl Into<Arc<Snapshot>>) -> TickOutcome {
        let snapshot = snapshot.into();
        self.tick += 1;

        match self.clock.refresh(&snapshot, &self.engine.cascade().profile().haste) {
            CombatEdge::Started => {
                info!(archetype = self.archetype(), "combat started");
                self.publish(Event::Session(SessionEvent::CombatStarted));
            }
            CombatEdge::Ended => {
                info!(archetype = self.archetype(), "combat ended; history cleared");
                self.publish(Event::Session(SessionEvent::CombatEnded));
            }
            CombatEdge::Unchanged => {}
        }

        let mut outcome = self.engine.tick(snapshot, &self.clock);
        outcome.trace.tick = self.tick;

        if !outcome.decision.is_empty() {
            debug!(
                tick = self.tick,
                main = ?outcome.decision.main,
                weaves = ?outcome.decision.weaves,
                "decision"
            );
        }

        if self.bus.is_some() {
            self.publish(Event::Decision(DecisionEvent {
                tick: self.tick,
                decision: outcome.decision.clone(),
            }));
            if self.config.engine.trace || !outcome.trace.faults.is_empty() {
                self.publish(Event::Trace(Box::new(outcome.trace.clone())));
            }
        }
        outcome
    }

    /// Records an action the executor committed, for "last used" guards.
    pub fn record_commit(&mut self, action: ActionId, slot: Slot) {
        self.clock.record_commit(action, slot);
    }

    /// Swaps in a new cascade between ticks.
    ///
    /// The cycle clock keeps its combat history; only the base cycle length
    /// follows the new archetype profile.
    pub fn replace_cascade(&mut self, cascade: RuleCascade) {
        self.replace(Arc::clone(self.engine.catalog()), cascade);
    }

    /// Swaps both catalog and cascade between ticks.
    pub fn replace(&mut self, catalog: Arc<ActionCatalog>, cascade: RuleCascade) {
        let cascade = Arc::new(cascade);
        self.clock
            .set_base_cycle_length(cascade.profile().base_cycle_length);
        info!(
            archetype = cascade.archetype(),
            rules = cascade.rule_count(),
            "cascade reloaded"
        );
        self.engine = Engine::new(catalog, cascade, self.config.engine.clone());
        self.publish(Event::Session(SessionEvent::Reloaded {
            archetype: self.archetype().to_string(),
        }));
    }

    fn publish(&self, event: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(event);
        }
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("engine", &self.engine)
            .field("tick", &self.tick)
            .finish()
    }
}
