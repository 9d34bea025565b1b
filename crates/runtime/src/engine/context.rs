//! Blackboard shared by every node during one tick.

use std::sync::Arc;

use behavior_tree::FaultSink;
use rotation_core::{
    ActionCatalog, ActionId, ClassKind, ConditionFault, CycleClock, DecisionOutput, RuleCascade,
    Snapshot,
};

use crate::trace::{RuleOutcome, RuleRecord, TickTrace};

/// Per-tick evaluation state.
///
/// The snapshot and clock are frozen for the tick; only the decision being
/// built, the weave budget and the trace change while nodes run.
pub struct TickContext {
    pub(crate) snapshot: Arc<Snapshot>,
    pub(crate) clock: CycleClock,
    pub(crate) catalog: Arc<ActionCatalog>,
    pub(crate) cascade: Arc<RuleCascade>,

    pub(crate) decision: DecisionOutput,
    /// Seconds still available for weave locks this tick.
    pub(crate) weave_budget: f32,
    pub(crate) max_weaves: usize,

    /// Class currently being evaluated.
    pub(crate) class: String,
    pub(crate) kind: ClassKind,
    /// Action of the rule node currently running; panics are charged to it.
    pub(crate) rule_action: Option<ActionId>,

    record_rules: bool,
    pub(crate) trace: TickTrace,
}

impl TickContext {
    pub(crate) fn new(
        snapshot: Arc<Snapshot>,
        clock: CycleClock,
        catalog: Arc<ActionCatalog>,
        cascade: Arc<RuleCascade>,
        max_weaves: usize,
        record_rules: bool,
    ) -> Self {
        let weave_budget = clock.cycle_remaining();
        Self {
            snapshot,
            clock,
            catalog,
            cascade,
            decision: DecisionOutput::default(),
            weave_budget,
            max_weaves,
            class: String::new(),
            kind: ClassKind::Main,
            rule_action: None,
            record_rules,
            trace: TickTrace::default(),
        }
    }

    pub(crate) fn enter_class(&mut self, name: &str, kind: ClassKind) {
        self.class.clear();
        self.class.push_str(name);
        self.kind = kind;
    }

    pub(crate) fn weaves_full(&self) -> bool {
        self.decision.weaves.len() >= self.max_weaves
    }

    pub(crate) fn record(&mut self, rule: &str, action: ActionId, outcome: RuleOutcome) {
        if let RuleOutcome::Fault {
            code,
            severity,
            message,
        } = &outcome
        {
            if severity.is_recoverable() {
                tracing::warn!(class = %self.class, rule, %action, code, %message, "rule evaluation fault");
            } else {
                tracing::error!(
                    class = %self.class,
                    rule,
                    %action,
                    code,
                    severity = severity.as_str(),
                    %message,
                    "rule evaluation fault"
                );
            }
            self.trace.faults.push(self.make_record(rule, action, outcome.clone()));
        }
        if self.record_rules {
            let record = self.make_record(rule, action, outcome);
            self.trace.rules.push(record);
        }
    }

    fn make_record(&self, rule: &str, action: ActionId, outcome: RuleOutcome) -> RuleRecord {
        RuleRecord {
            class: self.class.clone(),
            kind: self.kind,
            rule: rule.to_string(),
            action,
            outcome,
        }
    }
}

impl FaultSink for TickContext {
    fn record_fault(&mut self, label: &str, message: String) {
        let action = self.rule_action.unwrap_or(ActionId(0));
        let fault = ConditionFault::GuardPanicked {
            name: label.to_string(),
            message,
        };
        self.record(label, action, RuleOutcome::fault(&fault));
    }
}
