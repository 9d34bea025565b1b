//! Solver configuration loader.

use std::env;
use std::path::Path;

use rotation_core::SolverConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for solver configuration from TOML files and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    pub const ENV_LATE_WEAVE_FRACTION: &'static str = "ROTATION_LATE_WEAVE_FRACTION";
    pub const ENV_MAX_WEAVES: &'static str = "ROTATION_MAX_WEAVES";
    pub const ENV_FRAME_INTERVAL_MS: &'static str = "ROTATION_FRAME_INTERVAL_MS";
    pub const ENV_TRACE: &'static str = "ROTATION_TRACE";

    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<SolverConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SolverConfig> {
        let config: SolverConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> SolverConfig {
        Self::with_env(SolverConfig::default())
    }

    /// Applies `ROTATION_*` environment overrides to `config`.
    pub fn with_env(config: SolverConfig) -> SolverConfig {
        Self::with_overrides(config, |key| env::var(key).ok())
    }

    /// Applies overrides read through `lookup`. Unparsable values are ignored.
    pub fn with_overrides<F>(mut config: SolverConfig, lookup: F) -> SolverConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(fraction) = read::<f32, _>(&lookup, Self::ENV_LATE_WEAVE_FRACTION) {
            config.timing.late_weave_fraction = fraction;
        }
        if let Some(max) = read::<usize, _>(&lookup, Self::ENV_MAX_WEAVES) {
            config.engine.max_weaves_per_tick = max;
        }
        if let Some(interval) = read::<u64, _>(&lookup, Self::ENV_FRAME_INTERVAL_MS) {
            config.frame.interval_ms = interval.max(1);
        }
        if let Some(trace) = read::<bool, _>(&lookup, Self::ENV_TRACE) {
            config.engine.trace = trace;
        } else if lookup(Self::ENV_TRACE).is_some_and(|v| v.is_empty()) {
            // Also accept just setting the variable without value as "true"
            config.engine.trace = true;
        }

        config
    }
}

fn read<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConfigLoader::parse("").expect("empty config");
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ConfigLoader::parse("[engine]\nmax_weaves_per_tick = 1\n").expect("config");
        assert_eq!(config.engine.max_weaves_per_tick, 1);
        assert!(!config.engine.trace);
        assert_eq!(config.timing.late_weave_fraction, 0.4);
    }

    #[test]
    fn bundled_config_parses() {
        let config = ConfigLoader::parse(include_str!("../../data/config/solver.toml"))
            .expect("bundled config");
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ConfigLoader::ENV_LATE_WEAVE_FRACTION, "0.25"),
            (ConfigLoader::ENV_MAX_WEAVES, "1"),
            (ConfigLoader::ENV_FRAME_INTERVAL_MS, "not-a-number"),
            (ConfigLoader::ENV_TRACE, ""),
        ]);
        let config = ConfigLoader::with_overrides(SolverConfig::default(), |key| {
            vars.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.timing.late_weave_fraction, 0.25);
        assert_eq!(config.engine.max_weaves_per_tick, 1);
        assert_eq!(config.frame.interval_ms, 16);
        assert!(config.engine.trace);
    }
}
