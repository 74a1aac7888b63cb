mod settings;
mod sim;

use std::path::PathBuf;

use bending_collision::AbilityLookup;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "bending-cli", about = "Headless tools for the bending simulation core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML settings file (engine, collisions, abilities)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the registered abilities
    Info,
    /// Print the resolved collision rules
    Rules,
    /// Run the scripted skirmish and print what happened
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// World seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Print the full per-tick report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the skirmish twice and compare the results
    Determinism {
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("bending-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("tick: {} ms", settings.engine.tick_ms);
            let catalog = settings.catalog()?;
            for description in catalog.iter() {
                let triggers: Vec<String> = description
                    .activations()
                    .iter()
                    .map(|a| format!("{a:?}"))
                    .collect();
                println!(
                    "{:>3}  {:<12} {:<6} [{}]{}",
                    description.id().0,
                    description.name(),
                    description.element().name(),
                    triggers.join(", "),
                    if description.is_single_instance() { " single" } else { "" },
                );
            }
        }
        Commands::Rules => {
            let catalog = settings.catalog()?;
            let rules = settings.rules(&catalog)?;
            println!("{} collision rules", rules.len());
            for pair in rules.pairs() {
                let name = |id| catalog.ability_name(id).unwrap_or("?");
                println!(
                    "{:<24} {} removed={} {} removed={}{}",
                    pair.key(),
                    name(pair.first),
                    pair.remove_first,
                    name(pair.second),
                    pair.remove_second,
                    if pair.allow_same_user { " same-user" } else { "" },
                );
            }
        }
        Commands::Simulate { ticks, seed, json } => {
            let summary = sim::run(&settings, ticks, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for (step, report) in summary.reports.iter().enumerate() {
                    if report.collisions.is_empty() && report.removed.is_empty() {
                        continue;
                    }
                    println!(
                        "tick {:>4}: updated={} collisions={:?} removed={:?}",
                        step + 1,
                        report.updated,
                        report.collisions,
                        report.removed
                    );
                }
                println!(
                    "seed={} ticks={} collisions={} removals={} events={} hash={:#018x}",
                    summary.seed,
                    summary.ticks,
                    summary.collisions(),
                    summary.removals(),
                    summary.world_events,
                    summary.state_hash
                );
            }
        }
        Commands::Determinism { ticks, seed } => {
            let first = sim::run(&settings, ticks, seed)?;
            let second = sim::run(&settings, ticks, seed)?;
            println!("Run 1: hash={:#018x}, removals={}", first.state_hash, first.removals());
            println!("Run 2: hash={:#018x}, removals={}", second.state_hash, second.removals());
            if first != second {
                anyhow::bail!("runs diverged");
            }
            println!("Match: OK");
        }
    }

    Ok(())
}
