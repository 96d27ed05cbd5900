#![forbid(unsafe_code)]

//! Validated die faces.
//!
//! A [`Face`] can only hold a value in `1..=6`. Every value that enters the
//! system from the outside (provider payloads, configuration, tests) goes
//! through [`Face::new`] or [`str::parse`], so downstream code never has to
//! re-check the range.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when validating a face value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceError {
    /// The value parsed as an integer but lies outside `1..=6`.
    #[error("face value {0} is outside 1..=6")]
    OutOfRange(i64),
    /// The text is not a decimal integer literal.
    #[error("face payload {0:?} is not an integer")]
    NotAnInteger(String),
}

/// One face of a six-sided die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "i64", into = "u8")
)]
pub struct Face(u8);

impl Face {
    /// Smallest face value.
    pub const MIN: u8 = 1;
    /// Largest face value.
    pub const MAX: u8 = 6;

    /// The face a die rests on before its first roll.
    pub const ONE: Face = Face(1);

    /// All faces in ascending order.
    pub const ALL: [Face; 6] = [Face(1), Face(2), Face(3), Face(4), Face(5), Face(6)];

    /// Validate an integer into a face.
    pub fn new(value: i64) -> Result<Self, FaceError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(FaceError::OutOfRange(value))
        }
    }

    /// The numeric face value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index, suitable for indexing six-element tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl Default for Face {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Face> for u8 {
    fn from(face: Face) -> Self {
        face.0
    }
}

impl TryFrom<i64> for Face {
    type Error = FaceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<u8> for Face {
    type Error = FaceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

/// Strict decimal parsing.
///
/// Leading and trailing whitespace is ignored. Anything else that is not a
/// plain integer literal (`"3.0"`, `"3abc"`, `"0x3"`, `""`) is rejected, unlike
/// lenient prefix parsers that would accept `"3abc"` as 3.
impl FromStr for Face {
    type Err = FaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| FaceError::NotAnInteger(trimmed.to_string()))?;
        Self::new(value)
    }
}
