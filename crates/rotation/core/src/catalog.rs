//! Static action definitions.
//!
//! The catalog holds what never changes during a session: which slot an
//! action occupies, its unlock level, resource costs, range, status
//! prerequisites and fixed animation lock. Everything that changes per tick
//! (charges, recast timers) comes from the [`crate::Snapshot`].
//!
//! Catalogs are usually loaded from an [`ActionCatalogSpec`] document that
//! refers to resources and statuses by name; [`ActionCatalog::from_spec`]
//! resolves those names once so evaluation only ever compares ids.

use std::collections::{BTreeMap, HashMap};

use crate::error::CatalogError;
use crate::ids::{ActionId, ResourceId, StatusId};

/// Which cycle slot an action consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
    /// Consumes the single main cycle slot.
    Main,
    /// Fits inside the main cycle's downtime.
    Weave,
}

/// What an action may be aimed at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetKind {
    /// Always the actor itself; needs no visible entity.
    #[default]
    Actor,
    Hostile,
    Friendly,
    Any,
}

impl TargetKind {
    /// Returns `true` if an entity with the given hostility is acceptable.
    pub fn accepts(&self, hostile: bool) -> bool {
        match self {
            TargetKind::Actor => false,
            TargetKind::Hostile => hostile,
            TargetKind::Friendly => !hostile,
            TargetKind::Any => true,
        }
    }
}

/// An amount of a named resource.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceAmount {
    pub resource: ResourceId,
    pub amount: f32,
}

/// A status applied to the actor when the action resolves.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusGrant {
    pub status: StatusId,
    pub duration: f32,
}

/// Complete static specification of one action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionDef {
    pub id: ActionId,
    pub name: String,
    pub slot: Slot,
    /// Minimum actor level at which the action is unlocked.
    pub level: u32,
    pub costs: Vec<ResourceAmount>,
    /// Resources produced on use. Only world models apply these.
    pub gains: Vec<ResourceAmount>,
    /// Fixed animation lock in seconds.
    pub lock_time: f32,
    /// Maximum target distance; ignored for [`TargetKind::Actor`].
    pub range: f32,
    pub target: TargetKind,
    /// Statuses the actor must have.
    pub requires: Vec<StatusId>,
    /// Statuses the actor must not have.
    pub forbids: Vec<StatusId>,
    /// Statuses that make a cast-time action usable while moving.
    pub instant_with: Vec<StatusId>,
    /// Nominal recast interval and charge count, used by world models.
    pub recast: f32,
    pub max_charges: u8,
    pub cast_time: f32,
    pub applies: Vec<StatusGrant>,
}

impl ActionDef {
    /// Default animation lock for actions that don't declare one.
    pub const DEFAULT_LOCK_TIME: f32 = 0.6;

    /// Creates a self-targeted, level-1 action with no costs.
    pub fn new(id: ActionId, name: impl Into<String>, slot: Slot) -> Self {
        Self {
            id,
            name: name.into(),
            slot,
            level: 1,
            costs: Vec::new(),
            gains: Vec::new(),
            lock_time: Self::DEFAULT_LOCK_TIME,
            range: 0.0,
            target: TargetKind::Actor,
            requires: Vec::new(),
            forbids: Vec::new(),
            instant_with: Vec::new(),
            recast: 0.0,
            max_charges: 1,
            cast_time: 0.0,
            applies: Vec::new(),
        }
    }

    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn cost(mut self, resource: ResourceId, amount: f32) -> Self {
        self.costs.push(ResourceAmount { resource, amount });
        self
    }

    pub fn gain(mut self, resource: ResourceId, amount: f32) -> Self {
        self.gains.push(ResourceAmount { resource, amount });
        self
    }

    pub fn lock_time(mut self, seconds: f32) -> Self {
        self.lock_time = seconds;
        self
    }

    /// Aims the action at entities of `kind` within `range`.
    pub fn targets(mut self, kind: TargetKind, range: f32) -> Self {
        self.target = kind;
        self.range = range;
        self
    }

    pub fn requires(mut self, status: StatusId) -> Self {
        self.requires.push(status);
        self
    }

    pub fn forbids(mut self, status: StatusId) -> Self {
        self.forbids.push(status);
        self
    }

    pub fn instant_with(mut self, status: StatusId) -> Self {
        self.instant_with.push(status);
        self
    }

    pub fn recast(mut self, seconds: f32, max_charges: u8) -> Self {
        self.recast = seconds;
        self.max_charges = max_charges.max(1);
        self
    }

    pub fn cast_time(mut self, seconds: f32) -> Self {
        self.cast_time = seconds;
        self
    }

    pub fn applies(mut self, status: StatusId, duration: f32) -> Self {
        self.applies.push(StatusGrant { status, duration });
        self
    }

    /// No cost, no status prerequisite, no level gate, a single charge and
    /// an instant cast, so nothing but target validity can deny it.
    ///
    /// Only such actions are accepted as a cascade's filler.
    pub fn is_unconditional(&self) -> bool {
        self.costs.iter().all(|c| c.amount <= 0.0)
            && self.requires.is_empty()
            && self.forbids.is_empty()
            && self.level <= 1
            && self.max_charges <= 1
            && self.recast <= 0.0
            && self.cast_time <= 0.0
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |field| CatalogError::InvalidValue {
            action: self.name.clone(),
            field,
        };
        if !self.lock_time.is_finite() || self.lock_time < 0.0 {
            return Err(invalid("lock_time"));
        }
        if !self.range.is_finite() || self.range < 0.0 {
            return Err(invalid("range"));
        }
        if !self.recast.is_finite() || self.recast < 0.0 {
            return Err(invalid("recast"));
        }
        if !self.cast_time.is_finite() || self.cast_time < 0.0 {
            return Err(invalid("cast_time"));
        }
        if self
            .costs
            .iter()
            .chain(&self.gains)
            .any(|c| !c.amount.is_finite() || c.amount < 0.0)
        {
            return Err(invalid("resource amount"));
        }
        Ok(())
    }
}

/// All actions, resources and statuses known to an archetype.
#[derive(Clone, Debug, Default)]
pub struct ActionCatalog {
    actions: BTreeMap<ActionId, ActionDef>,
    action_names: HashMap<String, ActionId>,
    resources: BTreeMap<String, ResourceId>,
    statuses: BTreeMap<String, StatusId>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named resource.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        id: ResourceId,
    ) -> Result<(), CatalogError> {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(CatalogError::DuplicateName(name));
        }
        self.resources.insert(name, id);
        Ok(())
    }

    /// Registers a named status.
    pub fn add_status(&mut self, name: impl Into<String>, id: StatusId) -> Result<(), CatalogError> {
        let name = name.into();
        if self.statuses.contains_key(&name) {
            return Err(CatalogError::DuplicateName(name));
        }
        self.statuses.insert(name, id);
        Ok(())
    }

    /// Adds an action definition.
    pub fn insert(&mut self, def: ActionDef) -> Result<(), CatalogError> {
        def.validate()?;
        if self.actions.contains_key(&def.id) {
            return Err(CatalogError::DuplicateActionId(def.id));
        }
        if self.action_names.contains_key(&def.name) {
            return Err(CatalogError::DuplicateName(def.name));
        }
        self.action_names.insert(def.name.clone(), def.id);
        self.actions.insert(def.id, def);
        Ok(())
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionDef> {
        self.actions.get(&id)
    }

    pub fn action_id(&self, name: &str) -> Option<ActionId> {
        self.action_names.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&ActionDef> {
        self.action_id(name).and_then(|id| self.get(id))
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resources.get(name).copied()
    }

    pub fn status_id(&self, name: &str) -> Option<StatusId> {
        self.statuses.get(name).copied()
    }

    /// Name of an action for traces and logs.
    pub fn name_of(&self, id: ActionId) -> Option<&str> {
        self.get(id).map(|d| d.name.as_str())
    }

    pub fn resource_name(&self, id: ResourceId) -> Option<&str> {
        self.resources
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    /// Actions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDef> {
        self.actions.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, ResourceId)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolves a name-based catalog document.
    pub fn from_spec(spec: &ActionCatalogSpec) -> Result<Self, CatalogError> {
        Self::from_spec_with_lock(spec, ActionDef::DEFAULT_LOCK_TIME)
    }

    /// Like [`ActionCatalog::from_spec`], with the lock time used for actions
    /// that don't declare one.
    pub fn from_spec_with_lock(
        spec: &ActionCatalogSpec,
        default_lock_time: f32,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for r in &spec.resources {
            catalog.add_resource(r.name.clone(), ResourceId(r.id))?;
        }
        for s in &spec.statuses {
            catalog.add_status(s.name.clone(), StatusId(s.id))?;
        }
        for a in &spec.actions {
            let def = catalog.resolve_action(a, default_lock_time)?;
            catalog.insert(def)?;
        }
        Ok(catalog)
    }

    fn resolve_action(
        &self,
        spec: &ActionSpec,
        default_lock_time: f32,
    ) -> Result<ActionDef, CatalogError> {
        let resource = |name: &String| {
            self.resource_id(name)
                .ok_or_else(|| CatalogError::UnknownResource {
                    action: spec.name.clone(),
                    name: name.clone(),
                })
        };
        let status = |name: &String| {
            self.status_id(name).ok_or_else(|| CatalogError::UnknownStatus {
                action: spec.name.clone(),
                name: name.clone(),
            })
        };
        let amounts = |list: &[(String, f32)]| {
            list.iter()
                .map(|(name, amount)| {
                    Ok(ResourceAmount {
                        resource: resource(name)?,
                        amount: *amount,
                    })
                })
                .collect::<Result<Vec<_>, CatalogError>>()
        };
        let statuses = |list: &[String]| list.iter().map(status).collect::<Result<Vec<_>, _>>();

        Ok(ActionDef {
            id: ActionId(spec.id),
            name: spec.name.clone(),
            slot: spec.slot,
            level: spec.level,
            costs: amounts(&spec.costs)?,
            gains: amounts(&spec.gains)?,
            lock_time: spec.lock_time.unwrap_or(default_lock_time),
            range: spec.range,
            target: spec.target,
            requires: statuses(&spec.requires)?,
            forbids: statuses(&spec.forbids)?,
            instant_with: statuses(&spec.instant_with)?,
            recast: spec.recast,
            max_charges: spec.max_charges.max(1),
            cast_time: spec.cast_time,
            applies: spec
                .applies
                .iter()
                .map(|(name, duration)| {
                    Ok(StatusGrant {
                        status: status(name)?,
                        duration: *duration,
                    })
                })
                .collect::<Result<Vec<_>, CatalogError>>()?,
        })
    }
}

// ============================================================================
// Name-based document form
// ============================================================================

/// Catalog document as written in content files.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionCatalogSpec {
    #[cfg_attr(feature = "serde", serde(default))]
    pub resources: Vec<ResourceSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub statuses: Vec<StatusSpec>,
    pub actions: Vec<ActionSpec>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSpec {
    pub id: u16,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSpec {
    pub id: u32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionSpec {
    pub id: u32,
    pub name: String,
    pub slot: Slot,
    #[cfg_attr(feature = "serde", serde(default = "default_level"))]
    pub level: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub costs: Vec<(String, f32)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub gains: Vec<(String, f32)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lock_time: Option<f32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub range: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: TargetKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requires: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub forbids: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub instant_with: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub recast: f32,
    #[cfg_attr(feature = "serde", serde(default = "default_charges"))]
    pub max_charges: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cast_time: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub applies: Vec<(String, f32)>,
}

#[cfg(feature = "serde")]
fn default_level() -> u32 {
    1
}

#[cfg(feature = "serde")]
fn default_charges() -> u8 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_action(id: u32, name: &str) -> ActionSpec {
        ActionSpec {
            id,
            name: name.to_string(),
            slot: Slot::Main,
            level: 1,
            costs: vec![("mana".to_string(), 20.0)],
            gains: vec![],
            lock_time: None,
            range: 25.0,
            target: TargetKind::Hostile,
            requires: vec![],
            forbids: vec!["Silence".to_string()],
            instant_with: vec![],
            recast: 0.0,
            max_charges: 1,
            cast_time: 1.5,
            applies: vec![],
        }
    }

    fn spec() -> ActionCatalogSpec {
        ActionCatalogSpec {
            resources: vec![ResourceSpec {
                id: 1,
                name: "mana".to_string(),
            }],
            statuses: vec![StatusSpec {
                id: 7,
                name: "Silence".to_string(),
            }],
            actions: vec![spec_action(10, "Bolt")],
        }
    }

    #[test]
    fn resolves_names_to_ids() {
        let catalog = ActionCatalog::from_spec(&spec()).expect("valid catalog");
        let bolt = catalog.by_name("Bolt").expect("bolt registered");

        assert_eq!(bolt.id, ActionId(10));
        assert_eq!(bolt.costs[0].resource, ResourceId(1));
        assert_eq!(bolt.forbids, vec![StatusId(7)]);
        assert_eq!(bolt.lock_time, ActionDef::DEFAULT_LOCK_TIME);
        assert_eq!(catalog.resource_name(ResourceId(1)), Some("mana"));
    }

    #[test]
    fn rejects_unknown_resource() {
        let mut spec = spec();
        spec.actions[0].costs = vec![("rage".to_string(), 5.0)];

        let err = ActionCatalog::from_spec(&spec).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownResource {
                action: "Bolt".to_string(),
                name: "rage".to_string()
            }
        );
    }

    #[test]
    fn rejects_duplicate_ids_and_names() {
        let mut spec = spec();
        spec.actions.push(spec_action(10, "Other"));
        assert_eq!(
            ActionCatalog::from_spec(&spec).unwrap_err(),
            CatalogError::DuplicateActionId(ActionId(10))
        );

        let mut spec = self::spec();
        spec.actions.push(spec_action(11, "Bolt"));
        assert_eq!(
            ActionCatalog::from_spec(&spec).unwrap_err(),
            CatalogError::DuplicateName("Bolt".to_string())
        );
    }

    #[test]
    fn rejects_negative_lock_time() {
        let mut catalog = ActionCatalog::new();
        let err = catalog
            .insert(ActionDef::new(ActionId(1), "Broken", Slot::Weave).lock_time(-0.1))
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidValue { field: "lock_time", .. }));
    }

    #[test]
    fn unconditional_actions() {
        let filler = ActionDef::new(ActionId(1), "Filler", Slot::Main);
        let costly = ActionDef::new(ActionId(2), "Costly", Slot::Main).cost(ResourceId(1), 10.0);
        let charged = ActionDef::new(ActionId(3), "Charged", Slot::Main).recast(30.0, 2);
        // Refused while moving.
        let cast = ActionDef::new(ActionId(4), "Cast", Slot::Main).cast_time(1.5);
        let covered = ActionDef::new(ActionId(5), "Covered", Slot::Main)
            .cast_time(1.5)
            .instant_with(StatusId(1));
        let gated = ActionDef::new(ActionId(6), "Gated", Slot::Main).level(30);

        assert!(filler.is_unconditional());
        assert!(!costly.is_unconditional());
        assert!(!charged.is_unconditional());
        assert!(!cast.is_unconditional());
        assert!(!covered.is_unconditional());
        assert!(!gated.is_unconditional());
    }
}
