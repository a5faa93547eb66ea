//! Coverage Simulator Binary
//!
//! Runs a population scenario through plan selection, contract history
//! generation and claim adjudication, then prints payer statistics as JSON.
//!
//! # Usage
//!
//! ```bash
//! coverage-sim demos/scenario.json
//! coverage-sim demos/scenario.json --config demos/coverage-sim.toml --full
//! COVERAGE_SIM_SEED=7 COVERAGE_SIM_SELECTION_BEHAVIOR=best_rate coverage-sim demos/scenario.json
//! ```
//!
//! # Environment Variables
//!
//! * `COVERAGE_SIM_SEED` - Master random seed (default: 0)
//! * `COVERAGE_SIM_WORKERS` - Worker threads, 0 for all cores (default: 0)
//! * `COVERAGE_SIM_SELECTION_BEHAVIOR` - Plan finder (default: government_priority)
//! * `COVERAGE_SIM_MANDATE__YEAR` - Individual mandate year (default: 2006)
//! * `COVERAGE_SIM_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `COVERAGE_SIM_JSON_LOGS` - Emit logs as JSON (default: false)
//! * `RUST_LOG` - Overrides the log filter

use std::path::PathBuf;

use simulation::{run_population, CoverageEngine, Scenario, SimulationConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: coverage-sim <scenario.json> [--config <file.toml>] [--full]";

/// Command line arguments
#[derive(Debug, Default)]
struct Args {
    scenario: PathBuf,
    config: Option<PathBuf>,
    full: bool,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut args = Args::default();
    let mut scenario = None;
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().ok_or(USAGE)?;
                args.config = Some(PathBuf::from(path));
            }
            "--full" => args.full = true,
            "--help" | "-h" => return Err(USAGE.into()),
            _ if scenario.is_none() => scenario = Some(PathBuf::from(arg)),
            _ => return Err(USAGE.into()),
        }
    }
    args.scenario = scenario.ok_or(USAGE)?;
    Ok(args)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = parse_args()?;
    let config = SimulationConfig::load(args.config.as_deref())?;
    init_tracing(&config.log_level, config.json_logs);

    tracing::info!(
        seed = config.seed,
        selection = %config.selection_behavior,
        scenario = %args.scenario.display(),
        "Starting coverage simulation"
    );

    let scenario: Scenario = serde_json::from_str(&std::fs::read_to_string(&args.scenario)?)?;
    let engine = CoverageEngine::from_config(&config)?;
    let report = run_population(&engine, &scenario, config.workers)?;

    let output = if args.full {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.summary())?
    };
    println!("{}", output);
    Ok(())
}

/// Initializes the tracing subscriber. Logs go to stderr so stdout stays
/// valid JSON.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
