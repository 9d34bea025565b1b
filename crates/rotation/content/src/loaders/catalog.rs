//! Action catalog loader.

use std::path::Path;

use rotation_core::{ActionCatalog, ActionCatalogSpec};

use crate::loaders::{LoadResult, read_file};

/// Loader for action catalogs from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load a catalog from a RON file.
    ///
    /// Actions without an explicit `lock_time` get `default_lock_time`.
    pub fn load(path: &Path, default_lock_time: f32) -> LoadResult<ActionCatalog> {
        let content = read_file(path)?;
        Self::parse(&content, default_lock_time)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }

    /// Parse a catalog from RON text.
    pub fn parse(content: &str, default_lock_time: f32) -> LoadResult<ActionCatalog> {
        let spec: ActionCatalogSpec = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse catalog RON: {}", e))?;
        let catalog = ActionCatalog::from_spec_with_lock(&spec, default_lock_time)?;

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CATALOG: &str = r#"(
        resources: [(id: 1, name: "mana")],
        statuses: [(id: 4, name: "Swift")],
        actions: [
            (id: 1, name: "Bolt", slot: Main, range: 25.0, target: Hostile),
            (id: 2, name: "Surge", slot: Weave, costs: [("mana", 10.0)], requires: ["Swift"]),
            (id: 3, name: "Leap", slot: Weave, lock_time: Some(0.8)),
        ],
    )"#;

    #[test]
    fn loads_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CATALOG.as_bytes()).expect("write catalog");

        let catalog = CatalogLoader::load(file.path(), 0.5).expect("load catalog");
        assert_eq!(catalog.len(), 3);

        let surge = catalog.by_name("Surge").expect("surge");
        assert_eq!(surge.lock_time, 0.5);
        assert_eq!(surge.requires.len(), 1);
        assert_eq!(catalog.by_name("Leap").map(|d| d.lock_time), Some(0.8));
    }

    #[test]
    fn unknown_status_fails_to_load() {
        let broken = CATALOG.replace(r#"requires: ["Swift"]"#, r#"requires: ["Haste"]"#);
        let err = CatalogLoader::parse(&broken, 0.6).unwrap_err();
        assert!(err.to_string().contains("Haste"), "{err}");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = CatalogLoader::load(Path::new("/nonexistent/catalog.ron"), 0.6).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
