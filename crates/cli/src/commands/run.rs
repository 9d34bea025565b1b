//! Simulate a pull and print what the solver decided.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use rotation_core::{ActionCatalog, Mode, Selected, Slot};
use runtime::{
    Event, EventBus, ExecutionEvent, ExecutionReport, FrameLoop, RuleOutcome, Simulator, Solver,
    TickTrace, Topic, World,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::scenario::{ResourceArg, Scenario, Source, WorldArgs};

const DEFAULT_ARCHETYPE: &str = "simple_caster";

/// Simulate a pull and print each decision
#[derive(Parser)]
pub struct Run {
    /// Built-in archetype (see `rotation-sim list`)
    #[arg(short, long, value_name = "NAME", conflicts_with = "catalog")]
    archetype: Option<String>,

    /// Action catalog RON file
    #[arg(long, value_name = "FILE", requires = "cascade")]
    catalog: Option<PathBuf>,

    /// Rule cascade RON file, resolved against --catalog
    #[arg(long, value_name = "FILE", requires = "catalog")]
    cascade: Option<PathBuf>,

    /// Solver configuration TOML file (ROTATION_* variables override it)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(short, long, default_value = "60")]
    seconds: f32,

    /// World seconds between ticks
    #[arg(long, default_value = "0.25")]
    step: f32,

    /// Pre-pull countdown in seconds
    #[arg(long, value_name = "SECONDS")]
    countdown: Option<f32>,

    /// Resource start state as NAME=CURRENT/MAX[+REGEN] (repeatable)
    #[arg(short, long = "resource", value_name = "SPEC")]
    resources: Vec<ResourceArg>,

    /// Target health fraction removed per main action (0 keeps it alive)
    #[arg(long, default_value = "0.05")]
    damage: f32,

    /// Run without a hostile target
    #[arg(long)]
    no_target: bool,

    /// Host mode to switch on, e.g. burst or heal_single (repeatable; defaults to burst)
    #[arg(short, long = "mode", value_name = "MODE")]
    modes: Vec<Mode>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Record every evaluated rule, not only faults
    #[arg(short, long)]
    trace: bool,

    /// Drive the async frame loop instead of stepping the world directly
    #[arg(long)]
    live: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    /// One line per tick that produced a decision
    Text,
    /// One tick trace JSON object per line
    Json,
}

impl Run {
    pub async fn execute(self) -> Result<()> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            anyhow::bail!("--step must be a positive number of seconds");
        }

        let source = match (&self.catalog, &self.cascade) {
            (Some(catalog), Some(cascade)) => Source::Files {
                catalog: catalog.as_path(),
                cascade: cascade.as_path(),
            },
            _ => Source::Builtin(self.archetype.as_deref().unwrap_or(DEFAULT_ARCHETYPE)),
        };
        let mut scenario = Scenario::load(
            source,
            self.config.as_deref(),
            WorldArgs {
                resources: &self.resources,
                countdown: self.countdown,
                damage_per_main: self.damage,
                step: self.step,
                with_target: !self.no_target,
                modes: &self.modes,
            },
        )?;
        // The live JSON stream is built from published traces.
        scenario.config.engine.trace |=
            self.trace || (self.live && self.format == OutputFormat::Json);

        let ticks = (self.seconds / self.step).ceil().max(1.0) as u64;
        if self.live {
            self.run_live(scenario, ticks).await
        } else {
            self.run_stepped(scenario, ticks)
        }
    }

    /// Steps the world directly: snapshot, tick, commit, advance.
    fn run_stepped(&self, scenario: Scenario, ticks: u64) -> Result<()> {
        let printer = Printer::new(Arc::clone(&scenario.catalog), self.format);
        let mut world = World::new(Arc::clone(&scenario.catalog), scenario.sim);
        let mut solver = Solver::new(scenario.catalog, scenario.cascade, scenario.config);

        let mut committed = 0u64;
        let mut rejected = 0u64;
        for _ in 0..ticks {
            let outcome = solver.tick_traced(world.snapshot());
            let report = world.commit(&outcome.decision);
            for (slot, selected) in &report.committed {
                solver.record_commit(selected.action, *slot);
            }
            committed += report.committed.len() as u64;
            rejected += report.rejected.len() as u64;

            printer.tick(world.time(), &outcome.trace, &report)?;

            if world.target_health() == Some(0.0) {
                info!(time = world.time(), "target defeated");
                break;
            }
            world.advance(self.step);
        }

        printer.summary(solver.ticks(), committed, rejected, world.time());
        Ok(())
    }

    /// Runs the frame loop against the simulator and prints what it publishes.
    async fn run_live(&self, scenario: Scenario, ticks: u64) -> Result<()> {
        let catalog = Arc::clone(&scenario.catalog);
        let interval = Duration::from_millis(scenario.config.frame.interval_ms.max(1));
        let simulator = Simulator::new(Arc::clone(&catalog), scenario.sim);
        let solver = Solver::new(scenario.catalog, scenario.cascade, scenario.config);

        // Subscribe before the worker starts so no frame is missed.
        let bus = EventBus::with_capacity(solver.config().bus.capacity);
        let mut events = bus.subscribe(match self.format {
            OutputFormat::Text => Topic::Execution,
            OutputFormat::Json => Topic::Trace,
        });

        let frame_loop = FrameLoop::builder()
            .solver(solver)
            .simulator(simulator.clone())
            .event_bus(bus)
            .interval(interval)
            .max_frames(ticks)
            .build()
            .await?;
        let printer = Printer::new(catalog, self.format);
        let print_task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => printer.event(&event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "output fell behind the frame loop");
                    }
                    // The bus closes once the loop and its handles are gone.
                    Err(RecvError::Closed) => break,
                }
            }
            Ok::<_, anyhow::Error>(printer)
        });

        let stats = frame_loop.wait().await?;
        let printer = print_task.await.context("output task failed")??;
        let time = simulator.world().lock().await.time();
        printer.summary(stats.frames, stats.committed, stats.rejected, time);
        if stats.errors > 0 {
            warn!(errors = stats.errors, "frames skipped on provider errors");
        }
        Ok(())
    }
}

struct Printer {
    catalog: Arc<ActionCatalog>,
    format: OutputFormat,
}

impl Printer {
    fn new(catalog: Arc<ActionCatalog>, format: OutputFormat) -> Self {
        Self { catalog, format }
    }

    fn tick(&self, time: f32, trace: &TickTrace, report: &ExecutionReport) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", trace.to_json()?),
            OutputFormat::Text => {
                if !report.is_empty() {
                    let mut line = format!(
                        "{} {}",
                        style(format!("{:>7.2}s", time)).dim(),
                        style(format!("#{:<5}", trace.tick)).dim()
                    );
                    for (slot, selected) in &report.committed {
                        line.push_str(&format!("  {}", self.committed(*slot, selected)));
                    }
                    for (selected, reason) in &report.rejected {
                        line.push_str(&format!(
                            "  {} {} ({})",
                            style("rejected").red(),
                            self.name(selected),
                            reason
                        ));
                    }
                    println!("{}", line);
                }
                self.rules(trace);
            }
        }
        Ok(())
    }

    fn event(&self, event: &Event) -> Result<()> {
        match (self.format, event) {
            (OutputFormat::Json, Event::Trace(trace)) => println!("{}", trace.to_json()?),
            (
                OutputFormat::Text,
                Event::Execution(ExecutionEvent::Committed {
                    tick,
                    slot,
                    selected,
                }),
            ) => {
                println!(
                    "{}  {}",
                    style(format!("#{:<5}", tick)).dim(),
                    self.committed(*slot, selected)
                );
            }
            (
                OutputFormat::Text,
                Event::Execution(ExecutionEvent::Rejected {
                    tick,
                    selected,
                    reason,
                }),
            ) => {
                println!(
                    "{}  {} {} ({})",
                    style(format!("#{:<5}", tick)).dim(),
                    style("rejected").red(),
                    self.name(selected),
                    reason
                );
            }
            _ => {}
        }
        Ok(())
    }

    /// Per-rule lines, present only when tracing is on or a rule faulted.
    fn rules(&self, trace: &TickTrace) {
        let records = if trace.rules.is_empty() {
            &trace.faults
        } else {
            &trace.rules
        };
        for record in records {
            let outcome = match &record.outcome {
                RuleOutcome::Fired { target } => style(format!("fired -> {}", target)).green(),
                RuleOutcome::GuardFalse => style("guard false".to_string()).dim(),
                RuleOutcome::Denied { reason } => style(format!("denied: {}", reason)).dim(),
                RuleOutcome::NoRoom { lock_time, budget } => {
                    style(format!("no room ({:.2}s lock, {:.2}s left)", lock_time, budget)).yellow()
                }
                RuleOutcome::Duplicate => style("duplicate".to_string()).dim(),
                RuleOutcome::Fault { code, message, .. } => {
                    style(format!("fault [{}]: {}", code, message)).red()
                }
            };
            println!("          {:<12} {:<24} {}", record.class, record.rule, outcome);
        }
    }

    fn committed(&self, slot: Slot, selected: &Selected) -> String {
        let label = match slot {
            Slot::Main => style("main").bold().to_string(),
            Slot::Weave => style("weave").cyan().to_string(),
        };
        format!("{} {} -> {}", label, self.name(selected), selected.target)
    }

    fn name(&self, selected: &Selected) -> String {
        self.catalog
            .name_of(selected.action)
            .map(str::to_string)
            .unwrap_or_else(|| selected.action.to_string())
    }

    fn summary(&self, ticks: u64, committed: u64, rejected: u64, time: f32) {
        if self.format == OutputFormat::Json {
            return;
        }
        println!();
        println!(
            "{} {} ticks over {:.2}s, {} committed, {} rejected",
            style("Done:").bold().cyan(),
            ticks,
            time,
            committed,
            rejected
        );
    }
}
