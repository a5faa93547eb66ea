//! The simulated person, as seen by the coverage domain
//!
//! Demographic sampling and clinical simulation live elsewhere; this module
//! only carries the attributes plan selection and eligibility need.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::temporal::{age_in_years, one_year_before, to_date};
use core_kernel::PersonId;

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometres
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A free-form person attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Flag(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

/// Demographic and clinical attributes of one simulated person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub id: PersonId,
    pub birth_date: NaiveDate,
    /// Yearly income
    pub income: Decimal,
    /// Relative income level where 1.0 is the median
    #[serde(default = "default_income_level")]
    pub income_level: f64,
    /// Occupation level in [0, 1]; drives employer-provided coverage
    #[serde(default)]
    pub occupation_level: f64,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub pregnant: bool,
    #[serde(default)]
    pub blind: bool,
    /// End-stage renal disease
    #[serde(default)]
    pub esrd: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Encounter start times, ascending
    #[serde(default)]
    pub encounter_history: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

fn default_income_level() -> f64 {
    1.0
}

impl Person {
    /// Creates a person with the given birth date and yearly income
    pub fn new(birth_date: NaiveDate, income: Decimal) -> Self {
        Self {
            id: PersonId::new(),
            birth_date,
            income,
            income_level: default_income_level(),
            occupation_level: 0.0,
            location: None,
            pregnant: false,
            blind: false,
            esrd: false,
            disabled: false,
            encounter_history: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Age in completed years at `time`
    pub fn age_in_years(&self, time: DateTime<Utc>) -> u32 {
        age_in_years(self.birth_date, to_date(time))
    }

    /// Records an encounter, keeping the history sorted
    pub fn record_encounter(&mut self, start: DateTime<Utc>) {
        let idx = self.encounter_history.partition_point(|t| *t <= start);
        self.encounter_history.insert(idx, start);
    }

    /// Encounters that started in the twelve months up to and including `time`
    pub fn encounters_in_trailing_year(&self, time: DateTime<Utc>) -> usize {
        let Ok(year_ago) = one_year_before(time) else {
            return self.encounter_history.len();
        };
        self.encounter_history
            .iter()
            .rev()
            .skip_while(|t| **t > time)
            .take_while(|t| **t >= year_ago)
            .count()
    }

    /// Looks up a named attribute. Well-known names resolve to the typed
    /// fields; anything else falls through to the free-form map.
    pub fn attribute(&self, name: &str, time: DateTime<Utc>) -> Option<AttributeValue> {
        let value = match name {
            "age" => AttributeValue::Number(self.age_in_years(time) as f64),
            "income" => AttributeValue::Number(
                rust_decimal::prelude::ToPrimitive::to_f64(&self.income).unwrap_or(0.0),
            ),
            "income_level" => AttributeValue::Number(self.income_level),
            "occupation_level" => AttributeValue::Number(self.occupation_level),
            "pregnant" | "pregnancy" => AttributeValue::Flag(self.pregnant),
            "blind" | "blindness" => AttributeValue::Flag(self.blind),
            "esrd" | "end_stage_renal_disease" => AttributeValue::Flag(self.esrd),
            "disabled" => AttributeValue::Flag(self.disabled),
            other => return self.attributes.get(other).cloned(),
        };
        Some(value)
    }
}
