//! Rule cascade loader.

use std::path::Path;

use rotation_core::{ActionCatalog, CascadeSpec, GuardRegistry, RuleCascade};

use crate::loaders::{LoadResult, read_file};

/// Loader for rule cascades from RON files.
pub struct CascadeLoader;

impl CascadeLoader {
    /// Load and validate a cascade against `catalog`.
    ///
    /// Custom guards named by the cascade must already be registered in
    /// `guards`. Any invalid rule rejects the whole file.
    pub fn load(
        path: &Path,
        catalog: &ActionCatalog,
        guards: &GuardRegistry,
    ) -> LoadResult<RuleCascade> {
        let content = read_file(path)?;
        Self::parse(&content, catalog, guards)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    /// Parse the document without resolving it.
    pub fn parse_spec(content: &str) -> LoadResult<CascadeSpec> {
        ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse cascade RON: {}", e))
    }

    pub fn parse(
        content: &str,
        catalog: &ActionCatalog,
        guards: &GuardRegistry,
    ) -> LoadResult<RuleCascade> {
        let spec = Self::parse_spec(content)?;
        let cascade = spec.compile(catalog, guards)?;

        Ok(cascade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::{ClassKind, Condition, RotationError};

    use crate::loaders::CatalogLoader;

    const CATALOG: &str = r#"(
        resources: [(id: 1, name: "mana")],
        actions: [
            (id: 1, name: "Bolt", slot: Main, range: 25.0, target: Hostile),
            (id: 2, name: "Nuke", slot: Main, costs: [("mana", 20.0)], range: 25.0, target: Hostile),
            (id: 3, name: "Surge", slot: Weave, recast: 60.0),
        ],
    )"#;

    const CASCADE: &str = r#"(
        archetype: "Test",
        base_cycle_length: 2.5,
        classes: [
            (name: "main", kind: Main, rules: [
                (action: "Nuke", when: Resource(resource: "mana", cmp: Ge, value: 80.0)),
            ]),
            (name: "weave", kind: Weave, rules: [
                (action: "Surge", when: Custom("opener_done")),
            ]),
        ],
        filler: "Bolt",
    )"#;

    fn catalog() -> ActionCatalog {
        CatalogLoader::parse(CATALOG, 0.6).expect("catalog")
    }

    #[test]
    fn resolves_custom_guards() {
        let mut guards = GuardRegistry::new();
        guards.register("opener_done", |scope| Ok(scope.clock.main_actions_since_combat_start() > 3));

        let cascade = CascadeLoader::parse(CASCADE, &catalog(), &guards).expect("cascade");
        let weave = cascade.classes_of(ClassKind::Weave).next().expect("weave class");
        assert!(matches!(weave.rules[0].guard, Condition::Custom(_)));
    }

    #[test]
    fn unregistered_guard_rejects_cascade() {
        let err = CascadeLoader::parse(CASCADE, &catalog(), &GuardRegistry::new()).unwrap_err();
        let cascade_err = err
            .downcast_ref::<rotation_core::CascadeError>()
            .expect("cascade error");
        assert_eq!(cascade_err.error_code(), "UNKNOWN_GUARD");
    }

    #[test]
    fn malformed_ron_is_rejected() {
        let err = CascadeLoader::parse_spec("(archetype: \"x\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse cascade RON"));
    }
}
