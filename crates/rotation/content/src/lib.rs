//! Data-driven rotation content and loaders.
//!
//! This crate houses the built-in archetypes and the loaders that turn
//! RON/TOML documents into validated core types:
//! - Action catalogs (RON)
//! - Rule cascades (RON, resolved against a catalog)
//! - Solver configuration (TOML, with environment overrides)
//!
//! Every name in a document is resolved to an id at load time, so a document
//! that refers to an unknown action, resource or status never loads.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ArchetypeBundle, BuiltinArchetype, CascadeLoader, CatalogLoader, ConfigLoader, LoadResult,
};
