//! Payers and their aggregate statistics
//!
//! A payer is shared by every person enrolled in one of its plans, so its
//! reporting counters are updated concurrently from many worker threads.
//! Money totals are accumulated as fixed-point integers in atomics; the set
//! of unique customers sits behind a mutex.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, MoneyError, PersonId};

use crate::adjustment::AdjustmentStrategy;
use crate::person::GeoPoint;

/// Who funds the payer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Government,
    Private,
    /// The self-pay sentinel
    NoInsurance,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ownership::Government => "government",
            Ownership::Private => "private",
            Ownership::NoInsurance => "none",
        };
        f.write_str(s)
    }
}

/// Concurrent counters for one payer
#[derive(Debug, Default)]
pub struct PayerStatistics {
    /// Years of coverage per customer
    customers: Mutex<HashMap<PersonId, u32>>,
    member_months: AtomicU64,
    covered_entries: AtomicU64,
    uncovered_entries: AtomicU64,
    revenue: AtomicI64,
    covered_cost: AtomicI64,
    uncovered_cost: AtomicI64,
}

impl PayerStatistics {
    /// Counts one more year of coverage for the person
    pub fn increment_customers(&self, person: PersonId) {
        let mut customers = self
            .customers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *customers.entry(person).or_insert(0) += 1;
    }

    pub fn add_member_months(&self, months: u64) {
        self.member_months.fetch_add(months, Ordering::Relaxed);
    }

    pub fn increment_covered_entries(&self) {
        self.covered_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_uncovered_entries(&self) {
        self.uncovered_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_revenue(&self, amount: Money) -> Result<(), MoneyError> {
        Self::accumulate(&self.revenue, amount)
    }

    pub fn add_covered_cost(&self, amount: Money) -> Result<(), MoneyError> {
        Self::accumulate(&self.covered_cost, amount)
    }

    pub fn add_uncovered_cost(&self, amount: Money) -> Result<(), MoneyError> {
        Self::accumulate(&self.uncovered_cost, amount)
    }

    fn accumulate(counter: &AtomicI64, amount: Money) -> Result<(), MoneyError> {
        let units = amount.to_fixed_point()?;
        counter.fetch_add(units, Ordering::Relaxed);
        Ok(())
    }

    pub fn unique_customers(&self) -> usize {
        self.customers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Years of coverage recorded for one customer
    pub fn customer_utilization(&self, person: &PersonId) -> u32 {
        self.customers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(person)
            .copied()
            .unwrap_or(0)
    }

    /// Total years of coverage across all customers
    pub fn years_covered(&self) -> u64 {
        self.customers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .map(|years| u64::from(*years))
            .sum()
    }

    pub fn member_months(&self) -> u64 {
        self.member_months.load(Ordering::Relaxed)
    }

    pub fn covered_entries(&self) -> u64 {
        self.covered_entries.load(Ordering::Relaxed)
    }

    pub fn uncovered_entries(&self) -> u64 {
        self.uncovered_entries.load(Ordering::Relaxed)
    }

    pub fn revenue(&self) -> Money {
        Money::from_fixed_point(self.revenue.load(Ordering::Relaxed), Currency::USD)
    }

    pub fn covered_cost(&self) -> Money {
        Money::from_fixed_point(self.covered_cost.load(Ordering::Relaxed), Currency::USD)
    }

    pub fn uncovered_cost(&self) -> Money {
        Money::from_fixed_point(self.uncovered_cost.load(Ordering::Relaxed), Currency::USD)
    }
}

/// An insurance company or government program
#[derive(Debug)]
pub struct Payer {
    id: String,
    name: String,
    ownership: Ownership,
    location: Option<GeoPoint>,
    adjustment: AdjustmentStrategy,
    statistics: PayerStatistics,
}

impl Payer {
    pub const NO_INSURANCE_ID: &'static str = "no-insurance";

    pub fn new(id: impl Into<String>, name: impl Into<String>, ownership: Ownership) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ownership,
            location: None,
            adjustment: AdjustmentStrategy::None,
            statistics: PayerStatistics::default(),
        }
    }

    /// The self-pay payer backing the no-insurance plan
    pub fn no_insurance() -> Self {
        Self::new(Self::NO_INSURANCE_ID, "NO_INSURANCE", Ownership::NoInsurance)
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_adjustment(mut self, adjustment: AdjustmentStrategy) -> Self {
        self.adjustment = adjustment;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    pub fn adjustment(&self) -> &AdjustmentStrategy {
        &self.adjustment
    }

    pub fn statistics(&self) -> &PayerStatistics {
        &self.statistics
    }

    pub fn is_government(&self) -> bool {
        self.ownership == Ownership::Government
    }

    pub fn is_no_insurance(&self) -> bool {
        self.ownership == Ownership::NoInsurance
    }

    /// Point-in-time snapshot of the statistics
    pub fn summary(&self) -> PayerSummary {
        let stats = &self.statistics;
        PayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            ownership: self.ownership,
            unique_customers: stats.unique_customers(),
            years_covered: stats.years_covered(),
            member_months: stats.member_months(),
            revenue: stats.revenue(),
            covered_cost: stats.covered_cost(),
            uncovered_cost: stats.uncovered_cost(),
            covered_entries: stats.covered_entries(),
            uncovered_entries: stats.uncovered_entries(),
        }
    }
}

/// Serializable payer report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayerSummary {
    pub id: String,
    pub name: String,
    pub ownership: Ownership,
    pub unique_customers: usize,
    pub years_covered: u64,
    pub member_months: u64,
    pub revenue: Money,
    pub covered_cost: Money,
    pub uncovered_cost: Money,
    pub covered_entries: u64,
    pub uncovered_entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_customers_are_unique() {
        let payer = Payer::new("p1", "Acme", Ownership::Private);
        let person = PersonId::new();
        payer.statistics().increment_customers(person);
        payer.statistics().increment_customers(person);
        payer.statistics().increment_customers(PersonId::new());

        assert_eq!(payer.statistics().unique_customers(), 2);
        assert_eq!(payer.statistics().customer_utilization(&person), 2);
        assert_eq!(payer.statistics().years_covered(), 3);
    }

    #[test]
    fn test_concurrent_accumulation() {
        let payer = Arc::new(Payer::new("p1", "Acme", Ownership::Private));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let payer = Arc::clone(&payer);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        payer.statistics().add_revenue(Money::usd(dec!(0.01))).unwrap();
                        payer.statistics().increment_covered_entries();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = payer.summary();
        assert_eq!(summary.revenue, Money::usd(dec!(80.00)));
        assert_eq!(summary.covered_entries, 8000);
    }

    #[test]
    fn test_no_insurance_payer() {
        let payer = Payer::no_insurance();
        assert!(payer.is_no_insurance());
        assert!(!payer.is_government());
        assert_eq!(payer.ownership().to_string(), "none");
    }
}
