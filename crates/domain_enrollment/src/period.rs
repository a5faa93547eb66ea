//! Month-granular contract periods
//!
//! A period starts on the first day of a month and ends on the last day of a
//! month. A missing start or end means the period extends indefinitely in
//! that direction.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use core_kernel::temporal::to_date;
use core_kernel::{PlanBenefitPackageId, YearMonth};

use crate::error::EnrollmentError;

/// A span of months on one contract, or on none
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractPeriod<T> {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    contract_id: Option<T>,
    plan_benefit_package_id: Option<PlanBenefitPackageId>,
}

impl<T> ContractPeriod<T> {
    /// Creates a period, widening `start` to the first of its month and `end`
    /// to the last day of its month
    pub fn new(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        contract_id: Option<T>,
        plan_benefit_package_id: Option<PlanBenefitPackageId>,
    ) -> Self {
        Self {
            start: start.map(|d| YearMonth::of(d).first_day()),
            end: end.map(|d| YearMonth::of(d).last_day()),
            contract_id,
            plan_benefit_package_id,
        }
    }

    /// Open-ended period starting at the first day of `month`
    pub fn starting(
        month: YearMonth,
        contract_id: Option<T>,
        plan_benefit_package_id: Option<PlanBenefitPackageId>,
    ) -> Self {
        Self::new(Some(month.first_day()), None, contract_id, plan_benefit_package_id)
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// `None` when the period represents no coverage
    pub fn contract_id(&self) -> Option<&T> {
        self.contract_id.as_ref()
    }

    pub fn plan_benefit_package_id(&self) -> Option<PlanBenefitPackageId> {
        self.plan_benefit_package_id
    }

    pub fn is_enrolled(&self) -> bool {
        self.contract_id.is_some()
    }

    /// Every calendar year the period touches
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::UnboundedPeriod`] when either end is open.
    pub fn covered_years(&self) -> Result<Vec<i32>, EnrollmentError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok((start.year()..=end.year()).collect()),
            _ => Err(EnrollmentError::UnboundedPeriod(
                "either start or end is open".to_string(),
            )),
        }
    }

    /// Months of `year` (1-12) inside the period
    pub fn covered_months(&self, year: i32) -> Vec<u32> {
        if !self.covers_year(year) {
            return Vec::new();
        }
        let first = match self.start {
            Some(start) if start.year() == year => start.month(),
            _ => 1,
        };
        let last = match self.end {
            Some(end) if end.year() == year => end.month(),
            _ => 12,
        };
        (first..=last).collect()
    }

    /// Ends this period on the day before `next` starts
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentError::UnboundedPeriod`] when `next` has no start.
    pub fn set_end_before(&mut self, next: &ContractPeriod<T>) -> Result<(), EnrollmentError> {
        let next_start = next.start.ok_or_else(|| {
            EnrollmentError::UnboundedPeriod("following period has an open start".to_string())
        })?;
        self.end = next_start.pred_opt();
        Ok(())
    }

    /// Ends this period on the date of `stop`
    pub fn set_end(&mut self, stop: DateTime<Utc>) {
        self.end = Some(to_date(stop));
    }

    /// Whether the date of `time` falls inside the period
    pub fn covers(&self, time: DateTime<Utc>) -> bool {
        let date = to_date(time);
        self.start.map_or(true, |start| start <= date) && self.end.map_or(true, |end| end >= date)
    }

    /// Whether the period overlaps any part of `year`
    pub fn covers_year(&self, year: i32) -> bool {
        self.start.map_or(true, |start| start.year() <= year)
            && self.end.map_or(true, |end| end.year() >= year)
    }
}
