//! Per-tick evaluation trace.
//!
//! A [`TickTrace`] is a read-only projection of one tick's evaluation: which
//! rule was tried in which class and what happened to it. Building it never
//! influences the decision.

use serde::Serialize;

use rotation_core::{
    ActionId, ClassKind, ConditionFault, DecisionOutput, Denial, ErrorSeverity, RotationError,
    Target, WeaveWindow,
};

/// What happened to one rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// Guard passed, action usable and accepted.
    Fired { target: Target },
    GuardFalse,
    Denied { reason: Denial },
    /// Usable, but its lock time does not fit in the remaining cycle.
    NoRoom { lock_time: f32, budget: f32 },
    /// Already selected earlier in the tick.
    Duplicate,
    /// Guard or action guard could not be evaluated.
    Fault {
        code: &'static str,
        severity: ErrorSeverity,
        message: String,
    },
}

impl RuleOutcome {
    pub fn fault(fault: &ConditionFault) -> Self {
        RuleOutcome::Fault {
            code: fault.error_code(),
            severity: fault.severity(),
            message: fault.to_string(),
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, RuleOutcome::Fault { .. })
    }
}

/// One evaluated rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RuleRecord {
    pub class: String,
    pub kind: ClassKind,
    pub rule: String,
    pub action: ActionId,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Everything the engine looked at in one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickTrace {
    pub tick: u64,
    pub cycle_length: f32,
    pub cycle_remaining: f32,
    pub weave_window: Option<WeaveWindow>,
    /// Per-rule records; only filled when tracing is enabled.
    pub rules: Vec<RuleRecord>,
    /// Rule faults; always recorded.
    pub faults: Vec<RuleRecord>,
    pub decision: DecisionOutput,
}

impl TickTrace {
    /// The rule that fired in `class`, if any.
    pub fn fired_in(&self, class: &str) -> Option<&RuleRecord> {
        self.rules
            .iter()
            .find(|r| r.class == class && matches!(r.outcome, RuleOutcome::Fired { .. }))
    }

    /// Records for one rule label, in evaluation order.
    pub fn records_for<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a RuleRecord> + 'a {
        self.rules.iter().filter(move |r| r.rule == rule)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::TargetId;

    #[test]
    fn serializes_outcome_inline() {
        let trace = TickTrace {
            tick: 3,
            rules: vec![RuleRecord {
                class: "main".to_string(),
                kind: ClassKind::Main,
                rule: "Nuke".to_string(),
                action: ActionId(2),
                outcome: RuleOutcome::Fired {
                    target: Target::Entity(TargetId(9)),
                },
            }],
            ..TickTrace::default()
        };

        let json: serde_json::Value =
            serde_json::from_str(&trace.to_json().expect("serialize")).expect("parse");
        assert_eq!(json["tick"], 3);
        assert_eq!(json["rules"][0]["outcome"], "fired");
        assert_eq!(json["rules"][0]["rule"], "Nuke");
        assert!(trace.fired_in("main").is_some());
    }

    #[test]
    fn fault_carries_code_and_severity() {
        let outcome = RuleOutcome::fault(&ConditionFault::MissingAction(ActionId(4)));
        let record = RuleRecord {
            class: "main".to_string(),
            kind: ClassKind::Main,
            rule: "Gated".to_string(),
            action: ActionId(1),
            outcome,
        };

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["outcome"], "fault");
        assert_eq!(json["code"], "MISSING_ACTION");
        assert_eq!(json["severity"], "Recoverable");
    }
}
