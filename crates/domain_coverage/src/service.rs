//! Service categories a plan may or may not cover

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of care. Encounter classes plus the line-item kinds billed
/// underneath an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Wellness,
    Ambulatory,
    Outpatient,
    Inpatient,
    Emergency,
    UrgentCare,
    Home,
    Hospice,
    SkilledNursing,
    Virtual,
    Medication,
    Procedure,
    Immunization,
    Device,
    Supply,
    Report,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Wellness => "wellness",
            ServiceCategory::Ambulatory => "ambulatory",
            ServiceCategory::Outpatient => "outpatient",
            ServiceCategory::Inpatient => "inpatient",
            ServiceCategory::Emergency => "emergency",
            ServiceCategory::UrgentCare => "urgent_care",
            ServiceCategory::Home => "home",
            ServiceCategory::Hospice => "hospice",
            ServiceCategory::SkilledNursing => "skilled_nursing",
            ServiceCategory::Virtual => "virtual",
            ServiceCategory::Medication => "medication",
            ServiceCategory::Procedure => "procedure",
            ServiceCategory::Immunization => "immunization",
            ServiceCategory::Device => "device",
            ServiceCategory::Supply => "supply",
            ServiceCategory::Report => "report",
        }
    }

    const ALL: [ServiceCategory; 16] = [
        ServiceCategory::Wellness,
        ServiceCategory::Ambulatory,
        ServiceCategory::Outpatient,
        ServiceCategory::Inpatient,
        ServiceCategory::Emergency,
        ServiceCategory::UrgentCare,
        ServiceCategory::Home,
        ServiceCategory::Hospice,
        ServiceCategory::SkilledNursing,
        ServiceCategory::Virtual,
        ServiceCategory::Medication,
        ServiceCategory::Procedure,
        ServiceCategory::Immunization,
        ServiceCategory::Device,
        ServiceCategory::Supply,
        ServiceCategory::Report,
    ];
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .find(|c| c.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown service category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for category in ServiceCategory::ALL {
            assert_eq!(category.as_str().parse::<ServiceCategory>(), Ok(category));
        }
        assert_eq!("Urgent Care".parse::<ServiceCategory>(), Ok(ServiceCategory::UrgentCare));
        assert!("dental".parse::<ServiceCategory>().is_err());
    }
}
