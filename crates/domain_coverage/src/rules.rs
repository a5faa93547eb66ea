//! Simulation-wide constraints on plan selection
//!
//! Values here come from configuration and are shared read-only by every
//! person being simulated. Nothing in this module is global state; the engine
//! owns one [`SelectionRules`] and lends it out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::temporal::start_of_year;
use core_kernel::{Money, Rate};

use crate::person::Person;

/// Constraints applied when a person picks or pays for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRules {
    /// Instant the individual insurance mandate took effect
    pub mandate_time: DateTime<Utc>,
    /// Occupation level at or above which an employer provides coverage once
    /// the mandate is in effect
    pub mandate_occupation: f64,
    /// Share of yearly income a person is willing to spend on premiums
    pub income_premium_ratio: Rate,
    /// Share of an employer-sponsored premium the employer pays
    pub employer_coverage: Rate,
    /// Yearly income at the federal poverty line
    pub poverty_level: Decimal,
}

impl SelectionRules {
    pub const DEFAULT_MANDATE_YEAR: i32 = 2006;
    pub const DEFAULT_MANDATE_OCCUPATION: f64 = 0.2;

    /// Rules with the given mandate year and default thresholds
    pub fn with_mandate_year(year: i32) -> Self {
        Self {
            mandate_time: start_of_year(year),
            ..Self::default()
        }
    }

    /// Whether the mandate is in effect at `time`
    pub fn mandate_in_effect(&self, time: DateTime<Utc>) -> bool {
        time >= self.mandate_time
    }

    /// Whether the person's employer covers them at `time`
    pub fn employer_covered(&self, person: &Person, time: DateTime<Utc>) -> bool {
        self.mandate_in_effect(time) && person.occupation_level >= self.mandate_occupation
    }

    /// Whether a yearly cost fits in the person's premium budget
    pub fn can_afford(&self, person: &Person, yearly_cost: Money) -> bool {
        yearly_cost.amount() <= person.income * self.income_premium_ratio.as_decimal()
    }
}

impl Default for SelectionRules {
    fn default() -> Self {
        Self {
            mandate_time: start_of_year(Self::DEFAULT_MANDATE_YEAR),
            mandate_occupation: Self::DEFAULT_MANDATE_OCCUPATION,
            income_premium_ratio: Rate::new(dec!(0.034)),
            employer_coverage: Rate::new(dec!(0.75)),
            poverty_level: dec!(12880),
        }
    }
}
