//! Built-in archetypes and catalog/cascade pairs.
//!
//! Each built-in archetype embeds its RON documents at compile time so the
//! simulator runs without any data directory.

use std::fmt;
use std::path::Path;

use rotation_core::{ActionCatalog, GuardRegistry, RuleCascade, TimingConfig};

use crate::loaders::{CascadeLoader, CatalogLoader, LoadResult};

/// A catalog together with a cascade validated against it.
#[derive(Clone, Debug)]
pub struct ArchetypeBundle {
    pub catalog: ActionCatalog,
    pub cascade: RuleCascade,
}

impl ArchetypeBundle {
    /// Loads a catalog and a cascade from two RON files.
    pub fn load(
        catalog_path: &Path,
        cascade_path: &Path,
        timing: &TimingConfig,
        guards: &GuardRegistry,
    ) -> LoadResult<Self> {
        let catalog = CatalogLoader::load(catalog_path, timing.default_lock_time)?;
        let cascade = CascadeLoader::load(cascade_path, &catalog, guards)?;
        Ok(Self { catalog, cascade })
    }

    fn parse(
        catalog: &str,
        cascade: &str,
        timing: &TimingConfig,
        guards: &GuardRegistry,
    ) -> LoadResult<Self> {
        let catalog = CatalogLoader::parse(catalog, timing.default_lock_time)?;
        let cascade = CascadeLoader::parse(cascade, &catalog, guards)?;
        Ok(Self { catalog, cascade })
    }
}

/// Archetypes shipped with the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinArchetype {
    /// One resource, one spender, one filler.
    SimpleCaster,
    /// Countdown opener, emergency weave, haste and charge-based weaves.
    Arcanist,
}

impl BuiltinArchetype {
    pub const ALL: [BuiltinArchetype; 2] = [BuiltinArchetype::SimpleCaster, BuiltinArchetype::Arcanist];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinArchetype::SimpleCaster => "simple_caster",
            BuiltinArchetype::Arcanist => "arcanist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    fn sources(&self) -> (&'static str, &'static str) {
        match self {
            BuiltinArchetype::SimpleCaster => (
                include_str!("../../data/catalogs/simple_caster.ron"),
                include_str!("../../data/cascades/simple_caster.ron"),
            ),
            BuiltinArchetype::Arcanist => (
                include_str!("../../data/catalogs/arcanist.ron"),
                include_str!("../../data/cascades/arcanist.ron"),
            ),
        }
    }

    /// Loads the embedded documents.
    pub fn load(&self, timing: &TimingConfig, guards: &GuardRegistry) -> LoadResult<ArchetypeBundle> {
        let (catalog, cascade) = self.sources();
        ArchetypeBundle::parse(catalog, cascade, timing, guards)
            .map_err(|e| anyhow::anyhow!("built-in archetype {}: {}", self.name(), e))
    }
}

impl fmt::Display for BuiltinArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::ClassKind;

    #[test]
    fn builtin_archetypes_load() {
        for archetype in BuiltinArchetype::ALL {
            let bundle = archetype
                .load(&TimingConfig::default(), &GuardRegistry::new())
                .unwrap_or_else(|e| panic!("{archetype} failed to load: {e}"));
            assert_eq!(bundle.cascade.classes_of(ClassKind::Main).count(), 1);
        }
    }

    #[test]
    fn simple_caster_shape() {
        let bundle = BuiltinArchetype::SimpleCaster
            .load(&TimingConfig::default(), &GuardRegistry::new())
            .expect("simple caster");

        assert_eq!(bundle.cascade.archetype(), "SimpleCaster");
        assert_eq!(bundle.cascade.profile().base_cycle_length, 2.5);
        assert_eq!(
            bundle.catalog.name_of(bundle.cascade.filler().action),
            Some("SmallBolt")
        );
    }

    #[test]
    fn names_round_trip() {
        for archetype in BuiltinArchetype::ALL {
            assert_eq!(BuiltinArchetype::from_name(archetype.name()), Some(archetype));
        }
        assert_eq!(BuiltinArchetype::from_name("bard"), None);
    }
}
