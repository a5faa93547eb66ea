//! Coverage Simulation
//!
//! Ties the domain crates together: loads configuration, builds the payer and
//! plan catalog, and simulates a population of people across worker threads.
//!
//! # Example
//!
//! ```rust,ignore
//! use simulation::{run_population, CoverageEngine, Scenario, SimulationConfig};
//!
//! let config = SimulationConfig::load(Some(Path::new("demos/coverage-sim.toml")))?;
//! let engine = CoverageEngine::from_config(&config)?;
//! let scenario: Scenario = serde_json::from_str(&json)?;
//! let report = run_population(&engine, &scenario, config.workers)?;
//! println!("{}", serde_json::to_string_pretty(&report.summary())?);
//! ```

pub mod config;
pub mod catalog;
pub mod engine;
pub mod population;
pub mod error;

pub use config::{PayerConfig, PlanConfig, SimulationConfig};
pub use catalog::Catalog;
pub use engine::{
    CoverageEngine, Identity, PersonOutcome, PersonScenario, PersonSimulation, PlanPeriodSummary,
    Scenario, ScenarioEncounter, YearEnrollment,
};
pub use population::{effective_workers, run_population, PopulationReport, RunSummary};
pub use error::SimulationError;
