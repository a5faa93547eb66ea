//! Plan eligibility predicates
//!
//! Eligibility is a declarative tree of criteria evaluated against a person
//! at a point in time. Trees are built in code or resolved by name from an
//! [`EligibilityRegistry`], which also understands small `and`/`or`
//! expressions over registered names and attribute rules such as
//! `blindness == true` or `age >= 65`.
//!
//! Spenddown criteria also look at what the person has already spent, so
//! they are evaluated with the person's [`CoverageRecord`] when one exists.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::coverage_record::CoverageRecord;
use crate::error::CoverageError;
use crate::person::{AttributeValue, Person};

/// Medically needy monthly income limit used when none is configured
pub const DEFAULT_MONTHLY_SPENDDOWN: Decimal = dec!(522);

/// Comparison operator of an attribute rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LessOrEqual,
    GreaterOrEqual,
    NotEqual,
    Equal,
    Less,
    Greater,
}

impl Operator {
    /// Operator tokens in the order they must be tried when splitting
    const TOKENS: [(&'static str, Operator); 7] = [
        ("<=", Operator::LessOrEqual),
        (">=", Operator::GreaterOrEqual),
        ("!=", Operator::NotEqual),
        ("==", Operator::Equal),
        ("<", Operator::Less),
        (">", Operator::Greater),
        ("=", Operator::Equal),
    ];

    fn symbol(&self) -> &'static str {
        match self {
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::NotEqual => "!=",
            Operator::Equal => "==",
            Operator::Less => "<",
            Operator::Greater => ">",
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, Operator::Equal | Operator::NotEqual)
    }

    fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            Operator::LessOrEqual => actual <= expected,
            Operator::GreaterOrEqual => actual >= expected,
            Operator::NotEqual => actual != expected,
            Operator::Equal => actual == expected,
            Operator::Less => actual < expected,
            Operator::Greater => actual > expected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
}

/// A single `attribute op value` comparison
///
/// Numeric values allow every operator; anything else only `==` and `!=`.
/// A person without the attribute never satisfies the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeRule {
    attribute: String,
    operator: Operator,
    value: Operand,
}

impl AttributeRule {
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Whether the person's attribute satisfies the rule at `time`
    pub fn matches(&self, person: &Person, time: DateTime<Utc>) -> bool {
        let Some(actual) = person.attribute(&self.attribute, time) else {
            return false;
        };
        match (&self.value, actual) {
            (Operand::Number(expected), AttributeValue::Number(n)) => {
                self.operator.compare(n, *expected)
            }
            (Operand::Number(_), _) => false,
            (Operand::Text(expected), actual) => {
                let equal = actual.to_string().eq_ignore_ascii_case(expected);
                match self.operator {
                    Operator::Equal => equal,
                    Operator::NotEqual => !equal,
                    _ => false,
                }
            }
        }
    }
}

impl FromStr for AttributeRule {
    type Err = CoverageError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        for (token, operator) in Operator::TOKENS {
            let Some((attribute, value)) = compact.split_once(token) else {
                continue;
            };
            if attribute.is_empty() || value.is_empty() || value.contains(token) {
                continue;
            }
            let value = match value.parse::<f64>() {
                Ok(n) => Operand::Number(n),
                Err(_) if operator.is_equality() => Operand::Text(value.to_string()),
                Err(_) => return Err(CoverageError::InvalidAttributeRule(expression.to_string())),
            };
            return Ok(Self {
                attribute: attribute.to_string(),
                operator,
                value,
            });
        }
        Err(CoverageError::InvalidAttributeRule(expression.to_string()))
    }
}

impl TryFrom<String> for AttributeRule {
    type Error = CoverageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeRule> for String {
    fn from(rule: AttributeRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for AttributeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.value {
            Operand::Number(n) => n.to_string(),
            Operand::Text(s) => s.clone(),
        };
        write!(f, "{} {} {}", self.attribute, self.operator.symbol(), value)
    }
}

/// Criteria a person must meet to enroll in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Eligibility {
    /// Everyone qualifies
    Generic,
    AgeAtLeast { years: u32 },
    AgeBelow { years: u32 },
    /// Yearly income at or below a fixed threshold
    IncomeAtMost { income: Decimal },
    /// Yearly income at or below a multiple of the poverty level
    PovertyMultiplier {
        multiplier: Decimal,
        poverty_level: Decimal,
    },
    /// Income left after the current period's out-of-pocket and premium
    /// spending at or below a yearly threshold
    IncomeSpenddown { yearly_threshold: Decimal },
    Attribute { rule: AttributeRule },
    AllOf { criteria: Vec<Eligibility> },
    AnyOf { criteria: Vec<Eligibility> },
}

impl Eligibility {
    /// Whether `person` qualifies at `time`, with nothing spent yet
    pub fn is_person_eligible(&self, person: &Person, time: DateTime<Utc>) -> bool {
        self.is_eligible_given(person, time, None)
    }

    /// Whether `person` qualifies at `time`, counting the spending already
    /// recorded in `coverage`
    pub fn is_eligible_given(
        &self,
        person: &Person,
        time: DateTime<Utc>,
        coverage: Option<&CoverageRecord>,
    ) -> bool {
        match self {
            Eligibility::Generic => true,
            Eligibility::AgeAtLeast { years } => person.age_in_years(time) >= *years,
            Eligibility::AgeBelow { years } => person.age_in_years(time) < *years,
            Eligibility::IncomeAtMost { income } => person.income <= *income,
            Eligibility::PovertyMultiplier {
                multiplier,
                poverty_level,
            } => person.income <= *poverty_level * *multiplier,
            Eligibility::IncomeSpenddown { yearly_threshold } => {
                let remaining = coverage
                    .map_or(person.income, |record| record.income_remaining(person, time));
                remaining <= *yearly_threshold
            }
            Eligibility::Attribute { rule } => rule.matches(person, time),
            Eligibility::AllOf { criteria } => criteria
                .iter()
                .all(|c| c.is_eligible_given(person, time, coverage)),
            Eligibility::AnyOf { criteria } => criteria
                .iter()
                .any(|c| c.is_eligible_given(person, time, coverage)),
        }
    }

    fn flag(attribute: &str) -> Eligibility {
        Eligibility::Attribute {
            rule: AttributeRule {
                attribute: attribute.to_string(),
                operator: Operator::Equal,
                value: Operand::Text("true".to_string()),
            },
        }
    }

    /// Age 65 and over, end-stage renal disease, or disability
    pub fn medicare() -> Eligibility {
        Eligibility::AnyOf {
            criteria: vec![
                Eligibility::AgeAtLeast { years: 65 },
                Self::flag("esrd"),
                Self::flag("disabled"),
            ],
        }
    }

    /// Medically needy: income spent down to twelve months of the limit
    pub fn medically_needy(monthly_spenddown: Decimal) -> Eligibility {
        Eligibility::IncomeSpenddown {
            yearly_threshold: monthly_spenddown * dec!(12),
        }
    }

    /// Low income, blindness, or pregnancy under a higher income ceiling
    pub fn medicaid(poverty_level: Decimal) -> Eligibility {
        Eligibility::AnyOf {
            criteria: vec![
                Eligibility::PovertyMultiplier {
                    multiplier: dec!(1.33),
                    poverty_level,
                },
                Self::flag("blindness"),
                Eligibility::AllOf {
                    criteria: vec![
                        Self::flag("pregnant"),
                        Eligibility::PovertyMultiplier {
                            multiplier: dec!(2.0),
                            poverty_level,
                        },
                    ],
                },
            ],
        }
    }
}

/// Named eligibility criteria
#[derive(Debug, Clone, Default)]
pub struct EligibilityRegistry {
    entries: HashMap<String, Arc<Eligibility>>,
}

impl EligibilityRegistry {
    pub const GENERIC: &'static str = "generic";
    pub const MEDICARE: &'static str = "medicare";
    pub const MEDICAID: &'static str = "medicaid";
    pub const DUAL_ELIGIBLE: &'static str = "dual_eligible";
    pub const MEDICALLY_NEEDY: &'static str = "medically_needy";

    /// Registry holding the built-in criteria
    pub fn with_builtins(poverty_level: Decimal, monthly_spenddown: Decimal) -> Self {
        let medicare = Eligibility::medicare();
        let medicaid = Eligibility::medicaid(poverty_level);
        let dual = Eligibility::AllOf {
            criteria: vec![medicare.clone(), medicaid.clone()],
        };

        let mut entries = HashMap::new();
        entries.insert(Self::GENERIC.to_string(), Arc::new(Eligibility::Generic));
        entries.insert(Self::MEDICARE.to_string(), Arc::new(medicare));
        entries.insert(Self::MEDICAID.to_string(), Arc::new(medicaid));
        entries.insert(Self::DUAL_ELIGIBLE.to_string(), Arc::new(dual));
        entries.insert(
            Self::MEDICALLY_NEEDY.to_string(),
            Arc::new(Eligibility::medically_needy(monthly_spenddown)),
        );
        Self { entries }
    }

    /// Registers a named criterion. Names are case-insensitive and unique.
    pub fn register(
        &mut self,
        name: &str,
        eligibility: Eligibility,
    ) -> Result<Arc<Eligibility>, CoverageError> {
        let key = name.trim().to_ascii_lowercase();
        if key.is_empty() || self.entries.contains_key(&key) {
            return Err(CoverageError::DuplicateEligibility(name.to_string()));
        }
        let eligibility = Arc::new(eligibility);
        self.entries.insert(key, Arc::clone(&eligibility));
        Ok(eligibility)
    }

    /// Looks up a registered criterion by name
    pub fn get(&self, name: &str) -> Result<Arc<Eligibility>, CoverageError> {
        self.entries
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| CoverageError::UnknownEligibility(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Resolves a registered name, an attribute rule, or an `and`/`or`
    /// combination of those. `and` binds tighter than `or`.
    pub fn resolve(&self, expression: &str) -> Result<Arc<Eligibility>, CoverageError> {
        let alternatives = split_keyword(expression, "or");
        if alternatives.len() > 1 {
            let criteria = alternatives
                .iter()
                .map(|part| self.resolve_conjunction(part))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Arc::new(Eligibility::AnyOf { criteria }));
        }
        let conjuncts = split_keyword(expression, "and");
        if conjuncts.len() > 1 {
            return self.resolve_conjunction(expression).map(Arc::new);
        }
        self.resolve_term(expression)
    }

    fn resolve_conjunction(&self, expression: &str) -> Result<Eligibility, CoverageError> {
        let parts = split_keyword(expression, "and");
        if parts.len() == 1 {
            return self.resolve_term(expression).map(|e| (*e).clone());
        }
        let criteria = parts
            .iter()
            .map(|part| self.resolve_term(part).map(|e| (*e).clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Eligibility::AllOf { criteria })
    }

    fn resolve_term(&self, term: &str) -> Result<Arc<Eligibility>, CoverageError> {
        let term = term.trim();
        if let Ok(found) = self.get(term) {
            return Ok(found);
        }
        if Operator::TOKENS.iter().any(|(token, _)| term.contains(token)) {
            let rule = term.parse::<AttributeRule>()?;
            return Ok(Arc::new(Eligibility::Attribute { rule }));
        }
        Err(CoverageError::UnknownEligibility(term.to_string()))
    }
}

/// Splits on a whitespace-delimited keyword, ignoring case
fn split_keyword(expression: &str, keyword: &str) -> Vec<String> {
    let mut parts = vec![Vec::new()];
    for token in expression.split_whitespace() {
        if token.eq_ignore_ascii_case(keyword) {
            parts.push(Vec::new());
        } else if let Some(current) = parts.last_mut() {
            current.push(token);
        }
    }
    parts.into_iter().map(|p| p.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap()
    }

    fn person(birth_year: i32, income: Decimal) -> Person {
        Person::new(NaiveDate::from_ymd_opt(birth_year, 1, 1).unwrap(), income)
    }

    #[test]
    fn test_rule_parsing_prefers_compound_operators() {
        let rule: AttributeRule = "age >= 65".parse().unwrap();
        assert_eq!(rule.attribute(), "age");
        assert_eq!(rule.operator(), Operator::GreaterOrEqual);

        let rule: AttributeRule = "veteran=true".parse().unwrap();
        assert_eq!(rule.operator(), Operator::Equal);
        assert_eq!(rule.to_string(), "veteran == true");
    }

    #[test]
    fn test_rule_rejects_ordering_on_text() {
        assert!(matches!(
            "county < Suffolk".parse::<AttributeRule>(),
            Err(CoverageError::InvalidAttributeRule(_))
        ));
        assert!("no operator here".parse::<AttributeRule>().is_err());
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        let rule: AttributeRule = "veteran != true".parse().unwrap();
        assert!(!rule.matches(&person(1980, dec!(30000)), now()));
    }

    #[test]
    fn test_medicare_builtin() {
        let registry = EligibilityRegistry::with_builtins(dec!(12880), DEFAULT_MONTHLY_SPENDDOWN);
        let medicare = registry.get("Medicare").unwrap();

        assert!(medicare.is_person_eligible(&person(1950, dec!(90000)), now()));
        assert!(!medicare.is_person_eligible(&person(1980, dec!(90000)), now()));

        let mut esrd = person(1980, dec!(90000));
        esrd.esrd = true;
        assert!(medicare.is_person_eligible(&esrd, now()));
    }

    #[test]
    fn test_medicaid_builtin() {
        let registry = EligibilityRegistry::with_builtins(dec!(10000), DEFAULT_MONTHLY_SPENDDOWN);
        let medicaid = registry.get("medicaid").unwrap();

        assert!(medicaid.is_person_eligible(&person(1990, dec!(13300)), now()));
        assert!(!medicaid.is_person_eligible(&person(1990, dec!(13301)), now()));

        let mut pregnant = person(1990, dec!(19000));
        pregnant.pregnant = true;
        assert!(medicaid.is_person_eligible(&pregnant, now()));

        let mut blind = person(1990, dec!(90000));
        blind.blind = true;
        assert!(medicaid.is_person_eligible(&blind, now()));
    }

    #[test]
    fn test_dual_eligible_requires_both() {
        let registry = EligibilityRegistry::with_builtins(dec!(10000), DEFAULT_MONTHLY_SPENDDOWN);
        let dual = registry.get(EligibilityRegistry::DUAL_ELIGIBLE).unwrap();

        assert!(dual.is_person_eligible(&person(1950, dec!(5000)), now()));
        assert!(!dual.is_person_eligible(&person(1950, dec!(50000)), now()));
        assert!(!dual.is_person_eligible(&person(1990, dec!(5000)), now()));
    }

    #[test]
    fn test_medically_needy_builtin_without_spending() {
        let registry = EligibilityRegistry::with_builtins(dec!(10000), dec!(500));
        let needy = registry.get(EligibilityRegistry::MEDICALLY_NEEDY).unwrap();
        assert_eq!(
            *needy,
            Eligibility::IncomeSpenddown {
                yearly_threshold: dec!(6000)
            }
        );
        assert!(needy.is_person_eligible(&person(1990, dec!(6000)), now()));
        assert!(!needy.is_person_eligible(&person(1990, dec!(6001)), now()));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = EligibilityRegistry::with_builtins(dec!(12880), DEFAULT_MONTHLY_SPENDDOWN);
        assert!(matches!(
            registry.register("MEDICARE", Eligibility::Generic),
            Err(CoverageError::DuplicateEligibility(_))
        ));
        assert!(registry
            .register("seniors", Eligibility::AgeAtLeast { years: 60 })
            .is_ok());
        assert!(registry.contains("seniors"));
    }

    #[test]
    fn test_resolve_expressions() {
        let registry = EligibilityRegistry::with_builtins(dec!(10000), DEFAULT_MONTHLY_SPENDDOWN);
        let expr = registry.resolve("age >= 60 and income <= 20000 or blindness == true").unwrap();

        assert!(expr.is_person_eligible(&person(1955, dec!(15000)), now()));
        assert!(!expr.is_person_eligible(&person(1955, dec!(25000)), now()));

        let mut blind = person(1990, dec!(90000));
        blind.blind = true;
        assert!(expr.is_person_eligible(&blind, now()));

        assert!(matches!(
            registry.resolve("medicare and veterans"),
            Err(CoverageError::UnknownEligibility(_))
        ));
    }
}
