//! Billable clinical entries

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money};
use domain_coverage::ServiceCategory;

use crate::error::ClaimError;

/// Kind of clinical record that carries a cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Encounter,
    Medication,
    Procedure,
    Immunization,
    Report,
    Device,
    Supply,
}

impl EntryKind {
    /// Only encounters and medications are charged a copay, and only they
    /// may root a claim
    pub fn bears_copay(&self) -> bool {
        matches!(self, EntryKind::Encounter | EntryKind::Medication)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Encounter => "encounter",
            EntryKind::Medication => "medication",
            EntryKind::Procedure => "procedure",
            EntryKind::Immunization => "immunization",
            EntryKind::Report => "report",
            EntryKind::Device => "device",
            EntryKind::Supply => "supply",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clinical event with a sticker price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillableEntry {
    pub kind: EntryKind,
    /// Category of care, used for plan coverage and copay
    pub service: ServiceCategory,
    pub start: DateTime<Utc>,
    pub cost: Money,
}

impl BillableEntry {
    pub fn new(
        kind: EntryKind,
        service: ServiceCategory,
        start: DateTime<Utc>,
        cost: Money,
    ) -> Result<Self, ClaimError> {
        let entry = Self {
            kind,
            service,
            start,
            cost,
        };
        entry.validate()?;
        Ok(entry)
    }

    /// Plans and payer statistics are kept in US dollars
    pub const CURRENCY: Currency = Currency::USD;

    /// Rejects negative costs and costs not billed in [`Self::CURRENCY`]
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.cost.currency() != Self::CURRENCY {
            return Err(ClaimError::InvalidEntry(format!(
                "{} at {} is billed in {}, expected {}",
                self.kind,
                self.start,
                self.cost.currency(),
                Self::CURRENCY
            )));
        }
        if self.cost.is_negative() {
            return Err(ClaimError::InvalidEntry(format!(
                "{} at {} has negative cost {}",
                self.kind, self.start, self.cost
            )));
        }
        Ok(())
    }
}
