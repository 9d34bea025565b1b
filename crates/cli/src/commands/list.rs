//! List built-in archetypes.

use anyhow::Result;
use clap::Parser;
use console::style;
use rotation_content::BuiltinArchetype;
use rotation_core::{ActionDef, GuardRegistry, Slot, TimingConfig};

/// List built-in archetypes and their actions
#[derive(Parser)]
pub struct List {
    /// Also print every urgency class and its rules
    #[arg(short, long)]
    rules: bool,
}

impl List {
    pub fn execute(self) -> Result<()> {
        let timing = TimingConfig::default();
        let guards = GuardRegistry::new();

        for archetype in BuiltinArchetype::ALL {
            let bundle = archetype.load(&timing, &guards)?;
            let catalog = &bundle.catalog;
            let cascade = &bundle.cascade;

            println!(
                "{} {} (cycle {:.2}s)",
                style(archetype.name()).bold().cyan(),
                style(cascade.archetype()).dim(),
                cascade.profile().base_cycle_length
            );

            let (main, weave): (Vec<_>, Vec<_>) =
                catalog.iter().partition(|def| def.slot == Slot::Main);
            let names = |defs: &[&ActionDef]| {
                defs.iter()
                    .map(|def| def.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            println!("  {} {}", style("main:").bold(), names(&main));
            if !weave.is_empty() {
                println!("  {} {}", style("weave:").bold(), names(&weave));
            }

            if self.rules {
                for class in cascade.classes() {
                    println!("  {} [{}]", style(&class.name).yellow(), class.kind);
                    for rule in &class.rules {
                        let action = catalog.name_of(rule.action).unwrap_or("?");
                        println!("    {} -> {}", rule.label, action);
                    }
                }
                let filler = cascade.filler();
                println!(
                    "  {} {}",
                    style("filler:").yellow(),
                    catalog.name_of(filler.action).unwrap_or("?")
                );
            }
            println!();
        }

        Ok(())
    }
}
