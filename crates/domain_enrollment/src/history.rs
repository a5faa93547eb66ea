//! Contract histories
//!
//! A history is generated by walking every month from January of the first
//! year of history through the stop month. Each month two independent
//! change trials are drawn: the open-enrollment trial (which only counts in
//! January) and the mid-year trial. When either fires a new contract is
//! drawn, and a new period starts only if it differs from the current one.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::temporal::to_date;
use core_kernel::{SequentialCode, SimRng, YearMonth};

use crate::error::EnrollmentError;
use crate::period::ContractPeriod;
use crate::pool::{ContractPool, PlanBenefitPackagePool};

/// Default odds of switching contract at open enrollment
pub const DEFAULT_OPEN_ENROLLMENT_CHANGE: f64 = 0.20;

/// Default odds of switching contract in any given month
pub const DEFAULT_MID_YEAR_CHANGE: f64 = 0.01;

/// Longest history a request may ask for
pub const MAX_YEARS_OF_HISTORY: u32 = 200;

/// Per-month odds of a contract change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeProbabilities {
    pub open_enrollment: f64,
    pub mid_year: f64,
}

impl Default for ChangeProbabilities {
    fn default() -> Self {
        Self {
            open_enrollment: DEFAULT_OPEN_ENROLLMENT_CHANGE,
            mid_year: DEFAULT_MID_YEAR_CHANGE,
        }
    }
}

impl ChangeProbabilities {
    pub fn validate(&self) -> Result<(), EnrollmentError> {
        for (name, p) in [("open_enrollment", self.open_enrollment), ("mid_year", self.mid_year)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(EnrollmentError::invalid_configuration(format!(
                    "{} change probability {} outside 0.0 - 1.0",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

/// Everything needed to generate one history
#[derive(Debug, Clone, Copy)]
pub struct HistoryRequest {
    pub stop: DateTime<Utc>,
    pub years_of_history: u32,
    pub probabilities: ChangeProbabilities,
}

impl HistoryRequest {
    /// January of the first year of history
    pub fn first_month(&self) -> Result<YearMonth, EnrollmentError> {
        if self.years_of_history > MAX_YEARS_OF_HISTORY {
            return Err(EnrollmentError::invalid_configuration(format!(
                "years_of_history {} exceeds {}",
                self.years_of_history, MAX_YEARS_OF_HISTORY
            )));
        }
        let year = i32::try_from(self.years_of_history)
            .ok()
            .and_then(|years| self.stop.year().checked_sub(years))
            .filter(|year| NaiveDate::from_ymd_opt(*year, 1, 1).is_some())
            .ok_or_else(|| {
                EnrollmentError::invalid_configuration(format!(
                    "{} years of history before {} is out of range",
                    self.years_of_history, self.stop
                ))
            })?;
        Ok(YearMonth::january(year))
    }
}

/// A beneficiary's contiguous, non-overlapping contract periods in start order
#[derive(Debug, Clone, Serialize)]
pub struct ContractHistory<T> {
    periods: Vec<ContractPeriod<T>>,
}

impl<T: SequentialCode + PartialEq + std::fmt::Display> ContractHistory<T> {
    /// Generates a random history ending at `request.stop`
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::InvalidConfiguration`] for probabilities
    /// outside `[0, 1]` or a history longer than [`MAX_YEARS_OF_HISTORY`].
    pub fn generate(
        request: &HistoryRequest,
        contracts: &ContractPool<T>,
        packages: &PlanBenefitPackagePool,
        rng: &mut SimRng,
    ) -> Result<Self, EnrollmentError> {
        request.probabilities.validate()?;

        let first_month = request.first_month()?;
        let last_month = YearMonth::of(to_date(request.stop));

        let draw = |month: YearMonth, rng: &mut SimRng| {
            let contract = contracts.random_contract(rng);
            let package = packages.random_package(rng, contract.as_ref());
            ContractPeriod::starting(month, contract, package)
        };

        let mut periods = Vec::new();
        let mut current = draw(first_month, rng);

        for month in first_month.through(last_month) {
            let open_enrollment = rng.chance(request.probabilities.open_enrollment);
            let mid_year = rng.chance(request.probabilities.mid_year);
            if month == first_month || !((month.month() == 1 && open_enrollment) || mid_year) {
                continue;
            }

            let candidate = draw(month, rng);
            if candidate.contract_id() == current.contract_id() {
                continue;
            }
            current.set_end_before(&candidate)?;
            debug!(
                month = %month,
                from = ?current.contract_id().map(|c| c.to_string()),
                to = ?candidate.contract_id().map(|c| c.to_string()),
                kind = T::KIND,
                "Contract changed"
            );
            periods.push(std::mem::replace(&mut current, candidate));
        }

        current.set_end(request.stop);
        periods.push(current);
        Ok(Self { periods })
    }
}

impl<T> ContractHistory<T> {
    /// Wraps already-built periods, which must be in start order
    pub fn from_periods(periods: Vec<ContractPeriod<T>>) -> Self {
        Self { periods }
    }

    pub fn periods(&self) -> &[ContractPeriod<T>] {
        &self.periods
    }

    /// The contract in force at `time`, `None` when not enrolled
    pub fn contract_id_at(&self, time: DateTime<Utc>) -> Option<&T> {
        self.periods
            .iter()
            .find(|p| p.covers(time))
            .and_then(|p| p.contract_id())
    }

    /// The period containing `time`
    pub fn period_at(&self, time: DateTime<Utc>) -> Option<&ContractPeriod<T>> {
        self.periods.iter().find(|p| p.covers(time))
    }

    /// Periods overlapping `year`
    pub fn periods_in_year(&self, year: i32) -> Vec<&ContractPeriod<T>> {
        self.periods.iter().filter(|p| p.covers_year(year)).collect()
    }

    /// Months of `year` spent on some contract
    pub fn covered_months_count(&self, year: i32) -> usize {
        self.periods_in_year(year)
            .into_iter()
            .filter(|p| p.is_enrolled())
            .map(|p| p.covered_months(year).len())
            .sum()
    }
}
