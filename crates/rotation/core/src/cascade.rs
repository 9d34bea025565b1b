//! Rule cascades: the per-archetype priority configuration.
//!
//! A [`RuleCascade`] is an ordered list of urgency classes, each an ordered
//! list of rules, plus a filler for the main slot. It is validated as a whole
//! when it is built; an invalid cascade is rejected, never partially loaded.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::catalog::{ActionCatalog, Slot};
use crate::condition::{Condition, ConditionSpec, CustomGuard, GuardRegistry};
use crate::error::CascadeError;
use crate::ids::{ActionId, ResourceId, StatusId};
use crate::timing::Haste;
use crate::usability::{ActionOverrides, TargetStrategy, UseRequest};

/// Role of an urgency class in the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClassKind {
    /// Pre-pull opener; evaluated only while a countdown runs.
    Countdown,
    /// Weave actions that preempt normal weave ordering.
    Emergency,
    /// The single main-slot class.
    Main,
    Weave,
}

impl ClassKind {
    /// Slot that actions bound in this class must occupy.
    pub fn slot(self) -> Slot {
        match self {
            ClassKind::Countdown | ClassKind::Main => Slot::Main,
            ClassKind::Emergency | ClassKind::Weave => Slot::Weave,
        }
    }
}

/// A guard bound to an action.
#[derive(Clone, Debug)]
pub struct Rule {
    pub label: String,
    pub action: ActionId,
    pub guard: Condition,
    pub strategy: TargetStrategy,
    /// Bypasses the weave timing guard.
    pub uninterruptible: bool,
    pub reserve_charge: bool,
}

impl Rule {
    pub fn new(label: impl Into<String>, action: ActionId) -> Self {
        Self {
            label: label.into(),
            action,
            guard: Condition::Always,
            strategy: TargetStrategy::default(),
            uninterruptible: false,
            reserve_charge: false,
        }
    }

    pub fn when(mut self, guard: Condition) -> Self {
        self.guard = guard;
        self
    }

    pub fn target(mut self, strategy: TargetStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn uninterruptible(mut self) -> Self {
        self.uninterruptible = true;
        self
    }

    pub fn reserve_charge(mut self) -> Self {
        self.reserve_charge = true;
        self
    }

    /// The CanUse query this rule issues.
    pub fn request(&self) -> UseRequest {
        UseRequest {
            action: self.action,
            strategy: self.strategy,
            reserve_charge: self.reserve_charge,
        }
    }
}

/// A priority tier of rules.
#[derive(Clone, Debug)]
pub struct UrgencyClass {
    pub name: String,
    pub kind: ClassKind,
    pub rules: Vec<Rule>,
}

impl UrgencyClass {
    pub fn new(name: impl Into<String>, kind: ClassKind, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            kind,
            rules,
        }
    }
}

/// Static facts about an archetype that the cycle clock needs.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchetypeProfile {
    pub name: String,
    pub base_cycle_length: f32,
    pub haste: Vec<Haste>,
}

impl ArchetypeProfile {
    pub fn new(name: impl Into<String>, base_cycle_length: f32) -> Self {
        Self {
            name: name.into(),
            base_cycle_length,
            haste: Vec::new(),
        }
    }
}

/// A validated rule cascade.
#[derive(Clone, Debug)]
pub struct RuleCascade {
    profile: ArchetypeProfile,
    classes: Vec<UrgencyClass>,
    filler: Rule,
    overrides: ActionOverrides,
}

impl RuleCascade {
    /// Validates and assembles a cascade against `catalog`.
    pub fn new(
        profile: ArchetypeProfile,
        classes: Vec<UrgencyClass>,
        filler: Rule,
        overrides: ActionOverrides,
        catalog: &ActionCatalog,
    ) -> Result<Self, CascadeError> {
        if !profile.base_cycle_length.is_finite() || profile.base_cycle_length <= 0.0 {
            return Err(CascadeError::InvalidCycleLength {
                archetype: profile.name.clone(),
                value: profile.base_cycle_length,
            });
        }
        if let Some(h) = profile
            .haste
            .iter()
            .find(|h| !h.percent.is_finite() || !(0.0..100.0).contains(&h.percent))
        {
            return Err(CascadeError::InvalidNumber {
                rule: profile.name.clone(),
                detail: format!("haste {} must be within 0..100, got {}", h.status, h.percent),
            });
        }
        if classes.is_empty() {
            return Err(CascadeError::Empty(profile.name.clone()));
        }

        let mut names = HashSet::new();
        for class in &classes {
            if !names.insert(class.name.as_str()) {
                return Err(CascadeError::DuplicateClass(class.name.clone()));
            }
            if class.rules.is_empty() {
                return Err(CascadeError::EmptyClass(class.name.clone()));
            }
            for rule in &class.rules {
                check_slot(catalog, rule, class.kind.slot())?;
            }
        }

        let mains = classes.iter().filter(|c| c.kind == ClassKind::Main).count();
        if mains != 1 {
            return Err(CascadeError::MainClassCount(mains));
        }

        check_slot(catalog, &filler, Slot::Main)?;
        let filler_def = catalog
            .get(filler.action)
            .ok_or_else(|| CascadeError::UnknownAction {
                rule: filler.label.clone(),
                action: filler.action.to_string(),
            })?;
        if !filler_def.is_unconditional() || !matches!(filler.guard, Condition::Always) {
            return Err(CascadeError::FillerNotUnconditional {
                action: filler_def.name.clone(),
            });
        }

        for id in overrides.disabled.iter().chain(overrides.guards.keys()) {
            if catalog.get(*id).is_none() {
                return Err(CascadeError::UnknownAction {
                    rule: "overrides".to_string(),
                    action: id.to_string(),
                });
            }
        }
        if overrides.disabled.contains(&filler.action)
            || overrides.guards.contains_key(&filler.action)
        {
            return Err(CascadeError::FillerNotUnconditional {
                action: filler_def.name.clone(),
            });
        }

        Ok(Self {
            profile,
            classes,
            filler,
            overrides,
        })
    }

    pub fn profile(&self) -> &ArchetypeProfile {
        &self.profile
    }

    pub fn archetype(&self) -> &str {
        &self.profile.name
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> &[UrgencyClass] {
        &self.classes
    }

    /// Classes of one kind, in declaration order.
    pub fn classes_of(&self, kind: ClassKind) -> impl Iterator<Item = &UrgencyClass> {
        self.classes.iter().filter(move |c| c.kind == kind)
    }

    pub fn filler(&self) -> &Rule {
        &self.filler
    }

    pub fn overrides(&self) -> &ActionOverrides {
        &self.overrides
    }

    /// Total number of rules, filler included.
    pub fn rule_count(&self) -> usize {
        self.classes.iter().map(|c| c.rules.len()).sum::<usize>() + 1
    }
}

fn check_slot(catalog: &ActionCatalog, rule: &Rule, expected: Slot) -> Result<(), CascadeError> {
    let def = catalog
        .get(rule.action)
        .ok_or_else(|| CascadeError::UnknownAction {
            rule: rule.label.clone(),
            action: rule.action.to_string(),
        })?;
    if def.slot != expected {
        return Err(CascadeError::SlotMismatch {
            rule: rule.label.clone(),
            action: def.name.clone(),
            expected,
        });
    }
    Ok(())
}

// ============================================================================
// Name-based document form
// ============================================================================

/// Cascade document as written in content files.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CascadeSpec {
    pub archetype: String,
    pub base_cycle_length: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub haste: Vec<HasteSpec>,
    pub classes: Vec<ClassSpec>,
    /// Name of the always-available main action.
    pub filler: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub disabled_actions: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub action_guards: Vec<ActionGuardSpec>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HasteSpec {
    pub status: String,
    pub percent: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassSpec {
    pub name: String,
    pub kind: ClassKind,
    pub rules: Vec<RuleSpec>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSpec {
    /// Defaults to the action name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
    pub action: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub when: ConditionSpec,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: TargetStrategy,
    #[cfg_attr(feature = "serde", serde(default))]
    pub uninterruptible: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reserve_charge: bool,
}

impl RuleSpec {
    pub fn new(action: impl Into<String>, when: ConditionSpec) -> Self {
        Self {
            label: None,
            action: action.into(),
            when,
            target: TargetStrategy::default(),
            uninterruptible: false,
            reserve_charge: false,
        }
    }

    fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.action.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionGuardSpec {
    pub action: String,
    pub when: ConditionSpec,
}

impl Default for ConditionSpec {
    fn default() -> Self {
        ConditionSpec::Always
    }
}

impl CascadeSpec {
    /// Resolves names and validates the cascade.
    pub fn compile(
        &self,
        catalog: &ActionCatalog,
        guards: &GuardRegistry,
    ) -> Result<RuleCascade, CascadeError> {
        let profile = ArchetypeProfile {
            name: self.archetype.clone(),
            base_cycle_length: self.base_cycle_length,
            haste: self
                .haste
                .iter()
                .map(|h| {
                    Ok(Haste {
                        status: Resolver::new(catalog, guards, &self.archetype).status(&h.status)?,
                        percent: h.percent,
                    })
                })
                .collect::<Result<_, CascadeError>>()?,
        };

        let classes = self
            .classes
            .iter()
            .map(|class| {
                let rules = class
                    .rules
                    .iter()
                    .map(|rule| compile_rule(rule, catalog, guards))
                    .collect::<Result<_, _>>()?;
                Ok(UrgencyClass::new(class.name.clone(), class.kind, rules))
            })
            .collect::<Result<Vec<_>, CascadeError>>()?;

        let filler_rule = RuleSpec::new(self.filler.clone(), ConditionSpec::Always);
        let filler = compile_rule(&filler_rule, catalog, guards)?;

        let mut overrides = ActionOverrides::default();
        let resolver = Resolver::new(catalog, guards, "disabled_actions");
        overrides.disabled = self
            .disabled_actions
            .iter()
            .map(|name| resolver.action(name))
            .collect::<Result<BTreeSet<_>, _>>()?;
        overrides.guards = self
            .action_guards
            .iter()
            .map(|g| {
                let resolver = Resolver::new(catalog, guards, &g.action);
                Ok((resolver.action(&g.action)?, g.when.compile(&resolver)?))
            })
            .collect::<Result<BTreeMap<_, _>, CascadeError>>()?;

        RuleCascade::new(profile, classes, filler, overrides, catalog)
    }
}

fn compile_rule(
    spec: &RuleSpec,
    catalog: &ActionCatalog,
    guards: &GuardRegistry,
) -> Result<Rule, CascadeError> {
    let label = spec.label();
    let resolver = Resolver::new(catalog, guards, &label);
    Ok(Rule {
        action: resolver.action(&spec.action)?,
        guard: spec.when.compile(&resolver)?,
        strategy: spec.target,
        uninterruptible: spec.uninterruptible,
        reserve_charge: spec.reserve_charge,
        label,
    })
}

/// Name lookups for one rule, with errors that name the rule.
pub(crate) struct Resolver<'a> {
    catalog: &'a ActionCatalog,
    guards: &'a GuardRegistry,
    rule: &'a str,
}

impl<'a> Resolver<'a> {
    fn new(catalog: &'a ActionCatalog, guards: &'a GuardRegistry, rule: &'a str) -> Self {
        Self {
            catalog,
            guards,
            rule,
        }
    }

    pub(crate) fn action(&self, name: &str) -> Result<ActionId, CascadeError> {
        self.catalog
            .action_id(name)
            .ok_or_else(|| CascadeError::UnknownAction {
                rule: self.rule.to_string(),
                action: name.to_string(),
            })
    }

    pub(crate) fn resource(&self, name: &str) -> Result<ResourceId, CascadeError> {
        self.catalog
            .resource_id(name)
            .ok_or_else(|| CascadeError::UnknownResource {
                rule: self.rule.to_string(),
                name: name.to_string(),
            })
    }

    pub(crate) fn status(&self, name: &str) -> Result<StatusId, CascadeError> {
        self.catalog
            .status_id(name)
            .ok_or_else(|| CascadeError::UnknownStatus {
                rule: self.rule.to_string(),
                name: name.to_string(),
            })
    }

    pub(crate) fn guard(&self, name: &str) -> Result<CustomGuard, CascadeError> {
        self.guards
            .get(name)
            .ok_or_else(|| CascadeError::UnknownGuard {
                rule: self.rule.to_string(),
                name: name.to_string(),
            })
    }

    pub(crate) fn invalid(&self, detail: String) -> CascadeError {
        CascadeError::InvalidNumber {
            rule: self.rule.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDef, TargetKind};
    use crate::predicates::Cmp;

    fn catalog() -> ActionCatalog {
        let mut catalog = ActionCatalog::new();
        catalog.add_resource("mana", ResourceId(1)).expect("resource");
        catalog.add_status("Swift", StatusId(5)).expect("status");
        for def in [
            ActionDef::new(ActionId(1), "Bolt", Slot::Main).targets(TargetKind::Hostile, 25.0),
            ActionDef::new(ActionId(2), "Nuke", Slot::Main)
                .cost(ResourceId(1), 20.0)
                .targets(TargetKind::Hostile, 25.0),
            ActionDef::new(ActionId(3), "Surge", Slot::Weave).recast(60.0, 1),
        ] {
            catalog.insert(def).expect("action");
        }
        catalog
    }

    fn spec() -> CascadeSpec {
        CascadeSpec {
            archetype: "Tester".to_string(),
            base_cycle_length: 2.5,
            haste: vec![HasteSpec {
                status: "Swift".to_string(),
                percent: 10.0,
            }],
            classes: vec![
                ClassSpec {
                    name: "buffs".to_string(),
                    kind: ClassKind::Weave,
                    rules: vec![RuleSpec::new("Surge", ConditionSpec::InCombat)],
                },
                ClassSpec {
                    name: "main".to_string(),
                    kind: ClassKind::Main,
                    rules: vec![RuleSpec::new(
                        "Nuke",
                        ConditionSpec::Resource {
                            resource: "mana".to_string(),
                            cmp: Cmp::Ge,
                            value: 80.0,
                        },
                    )],
                },
            ],
            filler: "Bolt".to_string(),
            disabled_actions: vec![],
            action_guards: vec![],
        }
    }

    fn compile(spec: &CascadeSpec) -> Result<RuleCascade, CascadeError> {
        spec.compile(&catalog(), &GuardRegistry::new())
    }

    #[test]
    fn compiles_valid_cascade() {
        let cascade = compile(&spec()).expect("valid cascade");
        assert_eq!(cascade.archetype(), "Tester");
        assert_eq!(cascade.classes().len(), 2);
        assert_eq!(cascade.filler().action, ActionId(1));
        assert_eq!(cascade.profile().haste[0].status, StatusId(5));
        assert_eq!(cascade.rule_count(), 3);
    }

    #[test]
    fn unknown_action_rejects_whole_cascade() {
        let mut spec = spec();
        spec.classes[1].rules.push(RuleSpec::new("Meteor", ConditionSpec::Always));
        assert_eq!(
            compile(&spec).unwrap_err(),
            CascadeError::UnknownAction {
                rule: "Meteor".to_string(),
                action: "Meteor".to_string()
            }
        );
    }

    #[test]
    fn unknown_guard_is_rejected() {
        let mut spec = spec();
        spec.classes[0].rules[0].when = ConditionSpec::Custom("lucky".to_string());
        assert!(matches!(
            compile(&spec).unwrap_err(),
            CascadeError::UnknownGuard { name, .. } if name == "lucky"
        ));
    }

    #[test]
    fn main_action_in_weave_class_is_rejected() {
        let mut spec = spec();
        spec.classes[0].rules.push(RuleSpec::new("Nuke", ConditionSpec::Always));
        assert!(matches!(
            compile(&spec).unwrap_err(),
            CascadeError::SlotMismatch {
                expected: Slot::Weave,
                ..
            }
        ));
    }

    #[test]
    fn filler_must_be_unconditional() {
        let mut spec = spec();
        spec.filler = "Nuke".to_string();
        assert_eq!(
            compile(&spec).unwrap_err(),
            CascadeError::FillerNotUnconditional {
                action: "Nuke".to_string()
            }
        );
    }

    #[test]
    fn requires_exactly_one_main_class() {
        let mut spec = spec();
        spec.classes.remove(1);
        assert_eq!(compile(&spec).unwrap_err(), CascadeError::MainClassCount(0));
    }

    #[test]
    fn rejects_structural_problems() {
        let mut empty = spec();
        empty.classes.clear();
        assert_eq!(compile(&empty).unwrap_err(), CascadeError::Empty("Tester".to_string()));

        let mut duplicate = spec();
        duplicate.classes[1].name = "buffs".to_string();
        assert_eq!(
            compile(&duplicate).unwrap_err(),
            CascadeError::DuplicateClass("buffs".to_string())
        );

        let mut hollow = spec();
        hollow.classes[0].rules.clear();
        assert_eq!(
            compile(&hollow).unwrap_err(),
            CascadeError::EmptyClass("buffs".to_string())
        );

        let mut cycle = spec();
        cycle.base_cycle_length = 0.0;
        assert!(matches!(
            compile(&cycle).unwrap_err(),
            CascadeError::InvalidCycleLength { .. }
        ));
    }

    #[test]
    fn non_finite_threshold_is_rejected() {
        let mut spec = spec();
        spec.classes[1].rules[0].when = ConditionSpec::Resource {
            resource: "mana".to_string(),
            cmp: Cmp::Ge,
            value: f32::NAN,
        };
        assert!(matches!(
            compile(&spec).unwrap_err(),
            CascadeError::InvalidNumber { rule, .. } if rule == "Nuke"
        ));
    }

    #[test]
    fn overrides_resolve_names() {
        let mut spec = spec();
        spec.disabled_actions = vec!["Surge".to_string()];
        spec.action_guards = vec![ActionGuardSpec {
            action: "Nuke".to_string(),
            when: ConditionSpec::InCombat,
        }];
        let cascade = compile(&spec).expect("valid cascade");
        assert!(cascade.overrides().disabled.contains(&ActionId(3)));
        assert!(cascade.overrides().guards.contains_key(&ActionId(2)));

        spec.disabled_actions = vec!["Bolt".to_string()];
        assert!(matches!(
            compile(&spec).unwrap_err(),
            CascadeError::FillerNotUnconditional { .. }
        ));
    }

    #[test]
    fn guarded_filler_is_rejected() {
        let mut spec = spec();
        spec.action_guards = vec![ActionGuardSpec {
            action: "Bolt".to_string(),
            when: ConditionSpec::InCombat,
        }];
        assert_eq!(
            compile(&spec).unwrap_err(),
            CascadeError::FillerNotUnconditional {
                action: "Bolt".to_string()
            }
        );
    }

    #[test]
    fn filler_that_can_be_denied_is_rejected() {
        let mut catalog = catalog();
        catalog
            .insert(
                ActionDef::new(ActionId(4), "Fire", Slot::Main)
                    .targets(TargetKind::Hostile, 25.0)
                    .cast_time(1.5),
            )
            .expect("action");
        catalog
            .insert(
                ActionDef::new(ActionId(5), "Blaze", Slot::Main)
                    .targets(TargetKind::Hostile, 25.0)
                    .level(50),
            )
            .expect("action");

        for name in ["Fire", "Blaze"] {
            let mut spec = spec();
            spec.filler = name.to_string();
            assert_eq!(
                spec.compile(&catalog, &GuardRegistry::new()).unwrap_err(),
                CascadeError::FillerNotUnconditional {
                    action: name.to_string()
                }
            );
        }
    }
}
