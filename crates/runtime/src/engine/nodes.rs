//! Rule leaf node.
//!
//! A [`RuleNode`] is the only leaf the engine builds: guard, then duplicate
//! check, then the CanUse gate, then slot placement. It succeeds only when it
//! bound its action into the decision.

use behavior_tree::{Behavior, Status};
use rotation_core::{ClassKind, Denial, EvalScope, Rule, Selected, can_use};

use super::context::TickContext;
use crate::trace::RuleOutcome;

pub struct RuleNode {
    rule: Rule,
}

impl RuleNode {
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }

    pub fn boxed(rule: Rule) -> Box<dyn Behavior<TickContext>> {
        Box::new(Self::new(rule))
    }
}

impl Behavior<TickContext> for RuleNode {
    fn tick(&self, ctx: &mut TickContext) -> Status {
        let rule = &self.rule;
        ctx.rule_action = Some(rule.action);

        // Guard and usability read only the frozen snapshot and clock.
        let verdict = {
            let scope = EvalScope::new(&ctx.catalog, &ctx.snapshot, &ctx.clock);
            match rule.guard.evaluate(&scope) {
                Ok(true) => {}
                Ok(false) => {
                    ctx.record(&rule.label, rule.action, RuleOutcome::GuardFalse);
                    return Status::Failure;
                }
                Err(fault) => {
                    ctx.record(&rule.label, rule.action, RuleOutcome::fault(&fault));
                    return Status::Fault;
                }
            }

            if ctx.decision.contains(rule.action) {
                None
            } else {
                Some(can_use(ctx.cascade.overrides(), &rule.request(), &scope))
            }
        };

        let target = match verdict {
            None => {
                ctx.record(&rule.label, rule.action, RuleOutcome::Duplicate);
                return Status::Failure;
            }
            Some(Ok(target)) => target,
            Some(Err(Denial::ActionGuardFault(fault))) => {
                ctx.record(&rule.label, rule.action, RuleOutcome::fault(&fault));
                return Status::Fault;
            }
            Some(Err(reason)) => {
                tracing::trace!(rule = %rule.label, %reason, "rule denied");
                ctx.record(&rule.label, rule.action, RuleOutcome::Denied { reason });
                return Status::Failure;
            }
        };

        let selected = Selected::new(rule.action, target);
        match ctx.kind {
            ClassKind::Countdown | ClassKind::Main => {
                ctx.decision.main = Some(selected);
            }
            ClassKind::Emergency | ClassKind::Weave => {
                let lock_time = ctx
                    .catalog
                    .get(rule.action)
                    .map_or(0.0, |def| def.lock_time);
                let budget = ctx.weave_budget;
                if ctx.weaves_full() || (!rule.uninterruptible && !(budget > lock_time)) {
                    ctx.record(
                        &rule.label,
                        rule.action,
                        RuleOutcome::NoRoom { lock_time, budget },
                    );
                    return Status::Failure;
                }
                ctx.weave_budget = (budget - lock_time).max(0.0);
                ctx.decision.weaves.push(selected);
            }
        }

        tracing::debug!(
            class = %ctx.class,
            rule = %rule.label,
            action = %rule.action,
            %target,
            "rule fired"
        );
        ctx.record(&rule.label, rule.action, RuleOutcome::Fired { target });
        Status::Success
    }
}
