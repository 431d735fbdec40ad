//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Validation failures raised while building a value object.
///
/// These never escape past the boundary where the value is constructed:
/// callers either get a valid value or one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Points amount must not be negative (got {0})")]
    NegativePoints(i64),

    #[error("Points amount overflow: {left} + {right}")]
    PointsOverflow { left: i64, right: i64 },

    #[error("Points amount underflow: {left} - {right}")]
    PointsUnderflow { left: i64, right: i64 },

    #[error("Points value cannot be represented: {0}")]
    PointsUnrepresentable(Decimal),

    #[error("Conversion rate must be between 1 and 1000 (got {0})")]
    ConversionRateOutOfRange(i64),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Malformed {kind}: {value:?}")]
    MalformedId { kind: &'static str, value: String },

    #[error("Unknown points source: {0}")]
    UnknownPointsSource(String),
}

/// Broad classification used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected at construction
    Validation,
    /// A business rule refused the operation
    BusinessRule,
    /// Arithmetic or stored-data integrity was violated
    Integrity,
}

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant failures.
/// They are independent of the persistence and presentation layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Value object construction failed
    #[error(transparent)]
    Validation(ValueError),

    /// An empty identifier was handed to an aggregate operation
    #[error("{0} must not be empty")]
    EmptyIdentity(&'static str),

    /// Deduction exceeds the available balance
    #[error("Insufficient points for {reason:?}: requested {requested}, available {available}")]
    InsufficientPoints {
        requested: i64,
        available: i64,
        reason: String,
    },

    /// Recalculated total would fall below points already used
    #[error("Insufficient earned points after recalculation: recalculated {recalculated}, used {used}")]
    InsufficientEarnedAfterRecalculation { recalculated: i64, used: i64 },

    /// Accrual would overflow the points counter
    #[error("Earned points overflow: {current} + {addend}")]
    PointsOverflow { current: i64, addend: i64 },

    /// Stored state violates an invariant
    #[error("Corrupted data for account {account_id}: {detail}")]
    CorruptedData { account_id: String, detail: String },

    /// Two conversion rules would be active on the same day
    #[error("Conversion rule {start}..={end} overlaps an existing rule")]
    OverlappingConversionRule { start: NaiveDate, end: NaiveDate },
}

impl From<ValueError> for DomainError {
    fn from(err: ValueError) -> Self {
        match err {
            ValueError::PointsOverflow { left, right } => Self::PointsOverflow {
                current: left,
                addend: right,
            },
            other => Self::Validation(other),
        }
    }
}

impl DomainError {
    /// Create an insufficient points error
    pub fn insufficient_points(requested: i64, available: i64, reason: impl Into<String>) -> Self {
        Self::InsufficientPoints {
            requested,
            available,
            reason: reason.into(),
        }
    }

    /// Create a corrupted data error
    pub fn corrupted(account_id: impl ToString, detail: impl Into<String>) -> Self {
        Self::CorruptedData {
            account_id: account_id.to_string(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::EmptyIdentity(_) => ErrorKind::Validation,
            Self::InsufficientPoints { .. }
            | Self::InsufficientEarnedAfterRecalculation { .. }
            | Self::OverlappingConversionRule { .. } => ErrorKind::BusinessRule,
            Self::PointsOverflow { .. } | Self::CorruptedData { .. } => ErrorKind::Integrity,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Integrity)
    }

    pub fn is_corrupted_data(&self) -> bool {
        matches!(self, Self::CorruptedData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_points_error() {
        let err = DomainError::insufficient_points(150, 100, "reward redemption");

        assert!(err.is_client_error());
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
        assert!(err.to_string().contains("150"));
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("reward redemption"));
    }

    #[test]
    fn test_overflow_routes_to_integrity() {
        let err: DomainError = ValueError::PointsOverflow {
            left: i64::MAX,
            right: 1,
        }
        .into();

        assert!(matches!(err, DomainError::PointsOverflow { addend: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_other_value_errors_stay_validation() {
        let err: DomainError = ValueError::NegativePoints(-5).into();

        assert_eq!(err, DomainError::Validation(ValueError::NegativePoints(-5)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_corrupted_data_error() {
        let err = DomainError::corrupted("acc-1", "used points exceed earned points");

        assert!(err.is_corrupted_data());
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(err.to_string().contains("acc-1"));
    }
}
