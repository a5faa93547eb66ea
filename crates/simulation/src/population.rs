//! Parallel population runner
//!
//! Workers pull person indices from a shared atomic cursor, one person per
//! task. Each person owns its random stream and coverage record; the only
//! shared mutable state is the payers' atomic statistics. Identifiers are
//! issued in person order before any worker starts, so output does not
//! depend on the worker count.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use domain_coverage::PayerSummary;

use crate::engine::{CoverageEngine, PersonOutcome, Scenario};
use crate::error::SimulationError;

/// Result of a population run
#[derive(Debug, Clone, Serialize)]
pub struct PopulationReport {
    /// Outcomes in scenario order
    pub people: Vec<PersonOutcome>,
    /// Payer statistics after the run
    pub payers: Vec<PayerSummary>,
}

impl PopulationReport {
    /// Counts and payer statistics without per-person detail
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            people: self.people.len(),
            claims: self.people.iter().map(|p| p.claims.len()).sum(),
            payers: self.payers.clone(),
        }
    }
}

/// Compact report printed by the binary
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub people: usize,
    pub claims: usize,
    pub payers: Vec<PayerSummary>,
}

/// Worker count to use; zero means the available parallelism
pub fn effective_workers(requested: usize, people: usize) -> usize {
    let workers = if requested == 0 {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        requested
    };
    workers.min(people).max(1)
}

/// Simulates every person in the scenario
pub fn run_population(
    engine: &CoverageEngine,
    scenario: &Scenario,
    workers: usize,
) -> Result<PopulationReport, SimulationError> {
    scenario.validate()?;
    let started = Instant::now();
    let identities = scenario
        .people
        .iter()
        .map(|_| engine.issue_identity())
        .collect::<Result<Vec<_>, _>>()?;
    let workers = effective_workers(workers, scenario.people.len());
    info!(
        people = scenario.people.len(),
        workers,
        start = %scenario.start,
        end = %scenario.end,
        "Starting population run"
    );

    let cursor = AtomicUsize::new(0);
    let batches = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let cursor = &cursor;
                let identities = &identities;
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let (Some(person), Some(identity)) =
                            (scenario.people.get(index), identities.get(index))
                        else {
                            break;
                        };
                        let outcome =
                            engine.simulate(index, *identity, person, scenario.start, scenario.end);
                        done.push((index, outcome));
                    }
                    debug!(worker, people = done.len(), "Worker finished");
                    done
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| SimulationError::Worker("worker thread panicked".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut results: Vec<_> = batches.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);
    let people = results
        .into_iter()
        .map(|(_, outcome)| outcome)
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        people = people.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Population run complete"
    );

    Ok(PopulationReport {
        people,
        payers: engine.catalog().payer_summaries(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_workers() {
        assert_eq!(effective_workers(4, 10), 4);
        assert_eq!(effective_workers(4, 2), 2);
        assert_eq!(effective_workers(4, 0), 1);
        assert!(effective_workers(0, 100) >= 1);
    }
}
