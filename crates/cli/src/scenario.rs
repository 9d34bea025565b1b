//! Resolves command-line arguments into a catalog, a cascade, a solver
//! configuration and a world model.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use rotation_content::{ArchetypeBundle, BuiltinArchetype, ConfigLoader};
use rotation_core::{ActionCatalog, GuardRegistry, Mode, RuleCascade, SolverConfig};
use runtime::SimConfig;
use tracing::info;

/// Starting state for resources the command line does not mention.
static DEFAULT_RESOURCE: ResourceArg = ResourceArg {
    name: String::new(),
    current: 100.0,
    max: 100.0,
    regen_per_cycle: 5.0,
};

/// `NAME=CURRENT/MAX[+REGEN]`, e.g. `mana=0/100+5`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceArg {
    pub name: String,
    pub current: f32,
    pub max: f32,
    pub regen_per_cycle: f32,
}

impl FromStr for ResourceArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, amounts) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=CURRENT/MAX[+REGEN], got '{}'", s))?;
        let (pool, regen) = match amounts.split_once('+') {
            Some((pool, regen)) => (pool, Some(regen)),
            None => (amounts, None),
        };
        let (current, max) = pool
            .split_once('/')
            .ok_or_else(|| anyhow!("expected CURRENT/MAX in '{}'", s))?;

        let parse = |field: &str, what: &str| -> Result<f32> {
            field
                .trim()
                .parse::<f32>()
                .with_context(|| format!("invalid {} in '{}'", what, s))
        };
        let arg = Self {
            name: name.trim().to_string(),
            current: parse(current, "current")?,
            max: parse(max, "max")?,
            regen_per_cycle: regen
                .map(|r| parse(r, "regen"))
                .transpose()?
                .unwrap_or(DEFAULT_RESOURCE.regen_per_cycle),
        };
        if arg.name.is_empty() {
            bail!("missing resource name in '{}'", s);
        }
        if arg.max <= 0.0 {
            bail!("max must be positive in '{}'", s);
        }
        Ok(arg)
    }
}

/// Where the catalog and cascade come from.
pub enum Source<'a> {
    Builtin(&'a str),
    Files { catalog: &'a Path, cascade: &'a Path },
}

/// World parameters taken from the command line.
pub struct WorldArgs<'a> {
    pub resources: &'a [ResourceArg],
    pub countdown: Option<f32>,
    pub damage_per_main: f32,
    pub step: f32,
    pub with_target: bool,
    /// Replaces the world's default modes when not empty.
    pub modes: &'a [Mode],
}

/// Everything a run needs.
pub struct Scenario {
    pub catalog: Arc<ActionCatalog>,
    pub cascade: RuleCascade,
    pub config: SolverConfig,
    pub sim: SimConfig,
}

impl Scenario {
    pub fn load(source: Source<'_>, config_path: Option<&Path>, world: WorldArgs<'_>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SolverConfig::default(),
        };
        let config = ConfigLoader::with_env(config);

        let guards = GuardRegistry::new();
        let bundle = match source {
            Source::Builtin(name) => {
                let archetype = BuiltinArchetype::from_name(name).ok_or_else(|| {
                    anyhow!(
                        "unknown archetype '{}' (try `rotation-sim list`)",
                        name
                    )
                })?;
                archetype.load(&config.timing, &guards)?
            }
            Source::Files { catalog, cascade } => {
                ArchetypeBundle::load(catalog, cascade, &config.timing, &guards)?
            }
        };
        info!(
            archetype = bundle.cascade.archetype(),
            actions = bundle.catalog.len(),
            "archetype loaded"
        );

        for arg in world.resources {
            if bundle.catalog.resource_id(&arg.name).is_none() {
                bail!("catalog has no resource named '{}'", arg.name);
            }
        }

        let mut sim = SimConfig::for_profile(bundle.cascade.profile())
            .damage_per_main(world.damage_per_main)
            .step(world.step);
        for (name, id) in bundle.catalog.resources() {
            let arg = world
                .resources
                .iter()
                .find(|r| r.name == name)
                .unwrap_or(&DEFAULT_RESOURCE);
            sim = sim.resource(id, arg.current, arg.max, arg.regen_per_cycle);
        }
        if let Some(seconds) = world.countdown {
            sim = sim.countdown(seconds);
        }
        if !world.with_target {
            sim = sim.without_target();
        }
        if !world.modes.is_empty() {
            sim = sim.modes(world.modes.iter().copied());
        }

        Ok(Self {
            catalog: Arc::new(bundle.catalog),
            cascade: bundle.cascade,
            config,
            sim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_args() {
        let arg: ResourceArg = "mana=0/100+5".parse().expect("valid");
        assert_eq!(
            arg,
            ResourceArg {
                name: "mana".to_string(),
                current: 0.0,
                max: 100.0,
                regen_per_cycle: 5.0,
            }
        );

        let no_regen: ResourceArg = "heat = 20/50".parse().expect("valid");
        assert_eq!(no_regen.name, "heat");
        assert_eq!(no_regen.regen_per_cycle, DEFAULT_RESOURCE.regen_per_cycle);
    }

    #[test]
    fn rejects_malformed_resource_args() {
        for bad in ["mana", "mana=50", "=0/100", "mana=x/100", "mana=0/0"] {
            assert!(bad.parse::<ResourceArg>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn builtin_scenario_fills_every_resource() {
        let scenario = Scenario::load(
            Source::Builtin("simple_caster"),
            None,
            WorldArgs {
                resources: &["mana=0/100+5".parse().expect("valid")],
                countdown: None,
                damage_per_main: 0.0,
                step: 2.5,
                with_target: true,
                modes: &[Mode::HealSingle],
            },
        )
        .expect("scenario");

        let mana = scenario.catalog.resource_id("mana").expect("mana");
        let pool = scenario.sim.resources.iter().find(|r| r.id == mana).expect("configured");
        assert_eq!(pool.current, 0.0);
        assert_eq!(scenario.sim.step, 2.5);
        assert!(scenario.sim.modes.contains(&Mode::HealSingle));
        assert!(!scenario.sim.modes.contains(&Mode::Burst));
    }

    #[test]
    fn unknown_names_are_errors() {
        let world = || WorldArgs {
            resources: &[],
            countdown: None,
            damage_per_main: 0.0,
            step: 0.25,
            with_target: true,
            modes: &[],
        };
        assert!(Scenario::load(Source::Builtin("bard"), None, world()).is_err());

        let gauge = ["gauge=0/100".parse::<ResourceArg>().expect("valid")];
        let result = Scenario::load(
            Source::Builtin("simple_caster"),
            None,
            WorldArgs {
                resources: &gauge,
                ..world()
            },
        );
        assert!(result.is_err());
    }
}
