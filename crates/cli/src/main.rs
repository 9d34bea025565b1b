//! Rotation simulator entry point.
//!
//! Runs an archetype against the deterministic world model and prints what
//! the solver decided each tick.
//! Run with: `rotation-sim run --archetype arcanist --countdown 3`

mod commands;
mod logging;
mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use commands::{List, Run};

/// Rotation solver simulator
#[derive(Parser)]
#[command(name = "rotation-sim")]
#[command(about = "Drive a rotation cascade against a simulated target", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to `rotation-sim.log` in this directory
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Simulate a pull and print each decision
    Run(Run),

    /// List built-in archetypes and their actions
    List(List),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (ROTATION_* overrides, RUST_LOG)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::setup(cli.log_dir.as_deref())?;

    match cli.command {
        Command::Run(cmd) => cmd.execute().await,
        Command::List(cmd) => cmd.execute(),
    }
}
