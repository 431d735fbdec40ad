//! Points value objects
//!
//! Domain primitives for point quantities and conversion rates.
//! All values are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueError;

/// Lowest accepted conversion rate
const MIN_RATE: i64 = 1;

/// Highest accepted conversion rate
const MAX_RATE: i64 = 1000;

/// PointsAmount represents a validated count of loyalty points.
///
/// # Invariants
/// - Value is never negative
/// - Arithmetic is checked: results are new instances, never wrapped
///
/// # Example
/// ```
/// use points_ledger::domain::PointsAmount;
///
/// let earned = PointsAmount::new(100).unwrap();
/// let bonus = PointsAmount::new(20).unwrap();
/// assert_eq!(earned.add(bonus).unwrap().value(), 120);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PointsAmount(i64);

impl PointsAmount {
    /// Create a new PointsAmount with validation.
    ///
    /// # Errors
    /// - `ValueError::NegativePoints` if value < 0
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if value < 0 {
            return Err(ValueError::NegativePoints(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the underlying point count.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add two amounts, failing instead of wrapping past `i64::MAX`.
    pub fn add(&self, other: PointsAmount) -> Result<PointsAmount, ValueError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(ValueError::PointsOverflow {
                left: self.0,
                right: other.0,
            })
    }

    /// Subtract `other`, failing if the result would be negative.
    pub fn subtract(&self, other: PointsAmount) -> Result<PointsAmount, ValueError> {
        if other.0 > self.0 {
            return Err(ValueError::PointsUnderflow {
                left: self.0,
                right: other.0,
            });
        }
        Ok(Self(self.0 - other.0))
    }

    /// Check if this amount covers another.
    pub fn is_sufficient_for(&self, other: PointsAmount) -> bool {
        self.0 >= other.0
    }
}

impl fmt::Display for PointsAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for PointsAmount {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        PointsAmount::new(value)
    }
}

impl From<PointsAmount> for i64 {
    fn from(amount: PointsAmount) -> Self {
        amount.0
    }
}

// Note: Add/Sub operators are not implemented; `add` and `subtract` return
// Result so overflow and underflow stay explicit at every call site.

/// ConversionRate: how many currency units convert to one point.
///
/// # Invariants
/// - 1 <= value <= 1000
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ConversionRate(i64);

impl ConversionRate {
    /// Create a new ConversionRate with validation.
    ///
    /// # Errors
    /// - `ValueError::ConversionRateOutOfRange` outside 1..=1000
    pub fn new(value: i64) -> Result<Self, ValueError> {
        if !(MIN_RATE..=MAX_RATE).contains(&value) {
            return Err(ValueError::ConversionRateOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ConversionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:1", self.0)
    }
}

impl TryFrom<i64> for ConversionRate {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ConversionRate::new(value)
    }
}

impl From<ConversionRate> for i64 {
    fn from(rate: ConversionRate) -> Self {
        rate.0
    }
}
