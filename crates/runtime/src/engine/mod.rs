//! Priority resolution engine.
//!
//! Each urgency class of a [`RuleCascade`] is compiled once into a
//! behavior-tree [`Selector`](behavior_tree::Selector) of isolated
//! [`RuleNode`]s. A tick then runs the passes in a fixed order:
//!
//! 1. **Countdown**: while a countdown runs, only countdown classes are
//!    evaluated and the first usable rule becomes the main action.
//! 2. **Emergency**: emergency classes, as weave candidates.
//! 3. **Main**: the main class when the main slot is free, then the filler.
//! 4. **Weave**: remaining weave classes in declaration order.
//!
//! Within a class the first rule whose guard passes and whose action is
//! usable wins. Each class contributes at most one action.

mod context;
mod nodes;

pub use context::TickContext;
pub use nodes::RuleNode;

use std::sync::Arc;

use behavior_tree::{Behavior, builder};
use rotation_core::{
    ActionCatalog, ClassKind, CycleClock, DecisionOutput, EngineConfig, Rule, RuleCascade,
    Snapshot,
};

use crate::trace::TickTrace;

/// Decision plus the trace of how it was reached.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    pub decision: DecisionOutput,
    pub trace: TickTrace,
}

struct ClassTree {
    name: String,
    kind: ClassKind,
    root: Box<dyn Behavior<TickContext>>,
}

impl ClassTree {
    fn build(name: &str, kind: ClassKind, rules: &[Rule]) -> Self {
        let children = rules.iter().map(isolated).collect();
        Self {
            name: name.to_string(),
            kind,
            root: builder::selector(children),
        }
    }

    fn tick(&self, ctx: &mut TickContext) {
        ctx.enter_class(&self.name, self.kind);
        self.root.tick(ctx);
    }
}

fn isolated(rule: &Rule) -> Box<dyn Behavior<TickContext>> {
    builder::isolate(rule.label.clone(), RuleNode::boxed(rule.clone()))
}

/// Evaluates one cascade against snapshots.
///
/// The engine holds no per-tick state; the same snapshot and clock always
/// produce the same decision.
pub struct Engine {
    catalog: Arc<ActionCatalog>,
    cascade: Arc<RuleCascade>,
    countdown: Vec<ClassTree>,
    emergency: Vec<ClassTree>,
    main: Vec<ClassTree>,
    filler: ClassTree,
    weave: Vec<ClassTree>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(catalog: Arc<ActionCatalog>, cascade: Arc<RuleCascade>, config: EngineConfig) -> Self {
        let trees = |kind: ClassKind| -> Vec<ClassTree> {
            cascade
                .classes_of(kind)
                .map(|class| ClassTree::build(&class.name, class.kind, &class.rules))
                .collect()
        };
        let countdown = trees(ClassKind::Countdown);
        let emergency = trees(ClassKind::Emergency);
        let main = trees(ClassKind::Main);
        let weave = trees(ClassKind::Weave);
        let filler = ClassTree::build(
            "filler",
            ClassKind::Main,
            std::slice::from_ref(cascade.filler()),
        );

        Self {
            catalog,
            cascade,
            countdown,
            emergency,
            main,
            filler,
            weave,
            config,
        }
    }

    pub fn cascade(&self) -> &Arc<RuleCascade> {
        &self.cascade
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        &self.catalog
    }

    /// Runs one tick. Never fails: faults are isolated per rule and
    /// surface only in the trace.
    pub fn tick(&self, snapshot: Arc<Snapshot>, clock: &CycleClock) -> TickOutcome {
        let mut ctx = TickContext::new(
            snapshot,
            clock.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.cascade),
            self.config.max_weaves_per_tick,
            self.config.trace,
        );
        ctx.trace.cycle_length = clock.cycle_length();
        ctx.trace.cycle_remaining = clock.cycle_remaining();
        ctx.trace.weave_window = Some(clock.weave_window());

        let actor = &ctx.snapshot.actor;
        let main_free = actor.main_slot_free();
        let can_weave = !actor.is_mid_action();

        if ctx.snapshot.countdown_active() {
            if main_free {
                for class in &self.countdown {
                    class.tick(&mut ctx);
                    if ctx.decision.main.is_some() {
                        break;
                    }
                }
            }
        } else {
            if can_weave {
                self.weave_pass(&self.emergency, &mut ctx);
            }

            if main_free {
                for class in &self.main {
                    class.tick(&mut ctx);
                }
                if ctx.decision.main.is_none() {
                    self.filler.tick(&mut ctx);
                }
            }

            if can_weave {
                self.weave_pass(&self.weave, &mut ctx);
            }
        }

        let decision = ctx.decision;
        let mut trace = ctx.trace;
        trace.decision = decision.clone();
        TickOutcome { decision, trace }
    }

    fn weave_pass(&self, classes: &[ClassTree], ctx: &mut TickContext) {
        for class in classes {
            if ctx.weaves_full() {
                break;
            }
            class.tick(ctx);
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("archetype", &self.cascade.archetype())
            .field("rules", &self.cascade.rule_count())
            .field("config", &self.config)
            .finish()
    }
}
