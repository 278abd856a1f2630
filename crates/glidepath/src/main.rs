mod logging;
mod report;
mod scenario;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, bail};
use glidepath_core::model::SimulationMode;
use glidepath_core::{monte_carlo_simulate, simulate, summarize_years};

use crate::logging::{LogTarget, init_logging};
use crate::report::Report;
use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(name = "glidepath")]
#[command(about = "Month-by-month retirement projection for a household")]
struct Args {
    /// Scenario file (YAML)
    scenario: PathBuf,

    /// Run this many Monte Carlo trials and report their spread
    #[arg(short, long)]
    trials: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Path to the data directory (default: ~/.glidepath/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Log to stderr instead of the data directory
    #[arg(long)]
    log_stderr: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".glidepath")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::File(args.data_dir.clone().unwrap_or_else(default_data_dir))
    };
    init_logging(&target, &args.log_level)?;

    let scenario = Scenario::load(&args.scenario)?;
    let name = scenario.name.clone();
    let description = scenario.description.clone();
    let config = scenario.into_config()?;

    let series = simulate(&config).wrap_err("simulation failed")?;
    let years = summarize_years(&series);

    let monte_carlo = match args.trials {
        Some(0) => bail!("--trials must be at least 1"),
        Some(trials) => {
            if config.levers.mode != SimulationMode::MonteCarlo {
                tracing::warn!(
                    mode = ?config.levers.mode,
                    "every trial follows the same return path in this mode"
                );
            }
            Some(monte_carlo_simulate(&config, trials).wrap_err("Monte Carlo run failed")?)
        }
        None => None,
    };

    let report = Report {
        scenario: &name,
        description: &description,
        years: &years,
        monte_carlo: monte_carlo.as_ref().map(|mc| &mc.summary),
    };
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }

    tracing::info!(scenario = %name, years = years.len(), "report written");
    Ok(())
}
