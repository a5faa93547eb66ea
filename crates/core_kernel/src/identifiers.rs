//! Fixed-width alphanumeric identifiers
//!
//! Government and contract identifiers (HICN, MBI, Part C/D contract numbers,
//! plan benefit packages, CLIA lab numbers) are drawn from a bounded integer
//! space and rendered as fixed-length strings. A [`CodeFormat`] lists one
//! alphabet per character position; the value is written most-significant
//! position first using mixed-radix division, and parsing is the exact inverse.
//!
//! Positions whose alphabet holds a single character are fixed. The fake HICN
//! and MBI formats use them to pin the marker letters that flag an identifier
//! as synthetic, and `next()` preserves them because a single-character
//! position never carries.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Character alphabets used by the identifier formats
pub mod alphabet {
    pub const NUMERIC: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
    pub const NON_ZERO_NUMERIC: &[char] = &['1', '2', '3', '4', '5', '6', '7', '8', '9'];
    pub const ALPHA: &[char] = &[
        'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q',
        'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    ];
    /// Letters that cannot be mistaken for digits (no B, I, L, O, S, Z)
    pub const NON_NUMERIC_LIKE_ALPHA: &[char] = &[
        'A', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'M', 'N', 'P', 'Q', 'R', 'T', 'U', 'V',
        'W', 'X', 'Y',
    ];
    pub const ALPHA_NUMERIC: &[char] = &[
        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'C', 'D', 'E', 'F', 'G', 'H',
        'J', 'K', 'M', 'N', 'P', 'Q', 'R', 'T', 'U', 'V', 'W', 'X', 'Y',
    ];
    pub const FIXED_T: &[char] = &['T'];
    pub const FIXED_A: &[char] = &['A'];
    pub const FIXED_S: &[char] = &['S'];
    pub const FIXED_D: &[char] = &['D'];
}

/// Errors raised while encoding, decoding or allocating identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Value ({value}) out of range (0 - {max})")]
    OutOfRange { value: i128, max: u64 },

    #[error("Invalid format ({input}), must be {expected} characters")]
    InvalidLength { input: String, expected: usize },

    #[error("Unexpected character ({character}) at position {position} in {input}")]
    InvalidCharacter {
        input: String,
        character: char,
        position: usize,
    },

    #[error("{kind} identifiers exhausted at maximum value {max}")]
    Exhausted { kind: &'static str, max: u64 },
}

/// An ordered sequence of alphabets, one per character position
#[derive(Debug, PartialEq, Eq)]
pub struct CodeFormat {
    positions: &'static [&'static [char]],
}

impl CodeFormat {
    pub const fn new(positions: &'static [&'static [char]]) -> Self {
        Self { positions }
    }

    /// Number of characters in the rendered code
    pub fn width(&self) -> usize {
        self.positions.len()
    }

    /// The largest representable value: the product of alphabet sizes, minus one
    pub fn max_value(&self) -> u64 {
        self.positions
            .iter()
            .fold(1u64, |acc, alphabet| acc * alphabet.len() as u64)
            - 1
    }

    /// Renders `value` in this format
    pub fn encode(&self, value: u64) -> Result<String, IdentifierError> {
        self.check_range(value as i128)?;
        let mut remaining = value;
        let mut chars = vec![' '; self.width()];
        for (slot, alphabet) in chars.iter_mut().zip(self.positions.iter()).rev() {
            let radix = alphabet.len() as u64;
            *slot = alphabet[(remaining % radix) as usize];
            remaining /= radix;
        }
        Ok(chars.into_iter().collect())
    }

    /// Parses a rendered code back into its value. Hyphens are ignored and
    /// letters are matched case-insensitively.
    pub fn decode(&self, input: &str) -> Result<u64, IdentifierError> {
        let normalized: String = input
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if normalized.chars().count() != self.width() {
            return Err(IdentifierError::InvalidLength {
                input: normalized,
                expected: self.width(),
            });
        }
        let mut value = 0u64;
        for (position, (c, alphabet)) in normalized.chars().zip(self.positions.iter()).enumerate() {
            let index = alphabet.iter().position(|a| *a == c).ok_or_else(|| {
                IdentifierError::InvalidCharacter {
                    input: normalized.clone(),
                    character: c,
                    position,
                }
            })?;
            value = value * alphabet.len() as u64 + index as u64;
        }
        Ok(value)
    }

    fn check_range(&self, value: i128) -> Result<u64, IdentifierError> {
        let max = self.max_value();
        if value < 0 || value > max as i128 {
            return Err(IdentifierError::OutOfRange { value, max });
        }
        Ok(value as u64)
    }
}

/// An immutable value in a fixed-width format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidthCode {
    value: u64,
    format: &'static CodeFormat,
}

impl FixedWidthCode {
    /// Creates a code, failing if `value` is negative or above the format maximum
    pub fn new(value: i64, format: &'static CodeFormat) -> Result<Self, IdentifierError> {
        let value = format.check_range(value as i128)?;
        Ok(Self { value, format })
    }

    /// Parses a rendered code
    pub fn parse(input: &str, format: &'static CodeFormat) -> Result<Self, IdentifierError> {
        let value = format.decode(input)?;
        Ok(Self { value, format })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn format(&self) -> &'static CodeFormat {
        self.format
    }

    /// The code for `value + 1`. Does not modify `self`.
    pub fn next(&self) -> Result<Self, IdentifierError> {
        Self::new(self.value as i64 + 1, self.format)
    }
}

impl fmt::Display for FixedWidthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.format.encode(self.value).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// An identifier kind that can produce its successor
pub trait SequentialCode: Sized + Clone {
    /// Human readable kind, used in error messages and logs
    const KIND: &'static str;

    fn next(&self) -> Result<Self, IdentifierError>;
}

macro_rules! define_code {
    ($(#[$meta:meta])* $name:ident, $format:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(FixedWidthCode);

        impl $name {
            /// The character layout of this identifier kind
            pub const FORMAT: &'static CodeFormat = &$format;

            /// Creates an identifier from its numeric value
            pub fn new(value: i64) -> Result<Self, IdentifierError> {
                Ok(Self(FixedWidthCode::new(value, Self::FORMAT)?))
            }

            /// Parses an identifier from its text form
            pub fn parse(input: &str) -> Result<Self, IdentifierError> {
                Ok(Self(FixedWidthCode::parse(input, Self::FORMAT)?))
            }

            /// The largest representable identifier value
            pub fn max_value() -> u64 {
                Self::FORMAT.max_value()
            }

            pub fn value(&self) -> u64 {
                self.0.value()
            }

            pub fn code(&self) -> FixedWidthCode {
                self.0
            }
        }

        impl SequentialCode for $name {
            const KIND: &'static str = $kind;

            fn next(&self) -> Result<Self, IdentifierError> {
                Ok(Self(self.0.next()?))
            }
        }

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.value().hash(state);
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0.value().cmp(&other.0.value())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

use alphabet::*;

const HICN_FORMAT: CodeFormat = CodeFormat::new(&[
    FIXED_T, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, FIXED_A,
]);

const MBI_FORMAT: CodeFormat = CodeFormat::new(&[
    NON_ZERO_NUMERIC,
    FIXED_S,
    ALPHA_NUMERIC,
    NUMERIC,
    NON_NUMERIC_LIKE_ALPHA,
    ALPHA_NUMERIC,
    NUMERIC,
    NON_NUMERIC_LIKE_ALPHA,
    NON_NUMERIC_LIKE_ALPHA,
    NUMERIC,
    NUMERIC,
]);

const CONTRACT_FORMAT: CodeFormat =
    CodeFormat::new(&[ALPHA, NUMERIC, NUMERIC, NUMERIC, NUMERIC]);

const PLAN_BENEFIT_PACKAGE_FORMAT: CodeFormat = CodeFormat::new(&[NUMERIC, NUMERIC, NUMERIC]);

const CLIA_FORMAT: CodeFormat = CodeFormat::new(&[
    NUMERIC, NUMERIC, FIXED_D, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC, NUMERIC,
]);

define_code!(
    /// Synthetic Health Insurance Claim Number, `T########A`
    Hicn, HICN_FORMAT, "HICN"
);
define_code!(
    /// Synthetic Medicare Beneficiary Identifier with `S` in the second position
    Mbi, MBI_FORMAT, "MBI"
);
define_code!(
    /// Medicare Advantage (Part C) contract number, e.g. `Y0001`
    PartCContractId, CONTRACT_FORMAT, "Part C contract"
);
define_code!(
    /// Prescription drug plan (Part D) contract number, e.g. `Z0001`
    PartDContractId, CONTRACT_FORMAT, "Part D contract"
);
define_code!(
    /// Plan benefit package within a contract, e.g. `800`
    PlanBenefitPackageId, PLAN_BENEFIT_PACKAGE_FORMAT, "plan benefit package"
);
define_code!(
    /// Clinical laboratory (CLIA) number, `##D#######`
    CliaId, CLIA_FORMAT, "CLIA"
);

/// Issues identifiers one at a time from a shared cursor.
///
/// The cursor is guarded by a mutex so concurrent callers never receive the
/// same identifier. Once the last value of the format has been issued every
/// further call fails with [`IdentifierError::Exhausted`].
#[derive(Debug)]
pub struct SequentialAllocator<T: SequentialCode> {
    cursor: Mutex<Option<T>>,
    max: u64,
}

impl<T: SequentialCode> SequentialAllocator<T> {
    /// Creates an allocator whose first issued identifier is `first`
    pub fn starting_at(first: T, max: u64) -> Self {
        Self {
            cursor: Mutex::new(Some(first)),
            max,
        }
    }

    /// Issues the current identifier and advances the cursor
    pub fn allocate(&self) -> Result<T, IdentifierError> {
        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let current = cursor.take().ok_or(IdentifierError::Exhausted {
            kind: T::KIND,
            max: self.max,
        })?;
        *cursor = current.next().ok();
        Ok(current)
    }

    /// Issues `count` consecutive identifiers
    pub fn allocate_many(&self, count: usize) -> Result<Vec<T>, IdentifierError> {
        (0..count).map(|_| self.allocate()).collect()
    }
}

macro_rules! allocator_ctor {
    ($name:ident) => {
        impl SequentialAllocator<$name> {
            /// Allocator starting from the given text form
            pub fn parse_start(start: &str) -> Result<Self, IdentifierError> {
                Ok(Self::starting_at($name::parse(start)?, $name::max_value()))
            }
        }
    };
}

allocator_ctor!(Hicn);
allocator_ctor!(Mbi);
allocator_ctor!(PartCContractId);
allocator_ctor!(PartDContractId);
allocator_ctor!(PlanBenefitPackageId);
allocator_ctor!(CliaId);

/// Identifier of a simulated person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(Uuid);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PER-{}", self.0)
    }
}
