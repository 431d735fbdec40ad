//! Points calculation
//!
//! Converts monetary amounts into points at a conversion rate.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValueError;
use super::points::{ConversionRate, PointsAmount};

/// Anything that carries a monetary amount worth points.
pub trait CalculableTransaction {
    fn amount(&self) -> Decimal;
}

/// A purchase that the invoice pipeline has already verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub amount: Decimal,
    pub effective_date: NaiveDate,
    pub survey_completed: bool,
}

impl VerifiedTransaction {
    pub fn new(amount: Decimal, effective_date: NaiveDate) -> Self {
        Self {
            amount,
            effective_date,
            survey_completed: false,
        }
    }
}

impl CalculableTransaction for VerifiedTransaction {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Stateless amount → points conversion.
pub trait PointsCalculator {
    /// Points earned for a single amount at `rate`.
    fn calculate_from_amount(
        &self,
        amount: Decimal,
        rate: ConversionRate,
    ) -> Result<PointsAmount, ValueError>;

    /// Sum of per-transaction points.
    fn calculate_total_points<T: CalculableTransaction>(
        &self,
        transactions: &[T],
        rate: ConversionRate,
    ) -> Result<PointsAmount, ValueError> {
        transactions.iter().try_fold(PointsAmount::zero(), |total, tx| {
            let points = self.calculate_from_amount(tx.amount(), rate)?;
            total.add(points)
        })
    }
}

/// `floor(amount / rate)`; negative amounts earn nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorCalculator;

impl PointsCalculator for FloorCalculator {
    fn calculate_from_amount(
        &self,
        amount: Decimal,
        rate: ConversionRate,
    ) -> Result<PointsAmount, ValueError> {
        if amount <= Decimal::ZERO {
            return Ok(PointsAmount::zero());
        }

        let quotient = (amount / Decimal::from(rate.value())).floor();
        let points = quotient
            .to_i64()
            .ok_or(ValueError::PointsUnrepresentable(quotient))?;
        PointsAmount::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(value: i64) -> ConversionRate {
        ConversionRate::new(value).unwrap()
    }

    fn points(amount: Decimal, r: i64) -> i64 {
        FloorCalculator
            .calculate_from_amount(amount, rate(r))
            .unwrap()
            .value()
    }

    fn tx(amount: Decimal) -> VerifiedTransaction {
        VerifiedTransaction::new(amount, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(points(dec!(350), 100), 3);
        assert_eq!(points(dec!(200.00), 100), 2);
        assert_eq!(points(dec!(1000), 1), 1000);
    }

    #[test]
    fn test_floor_not_round() {
        assert_eq!(points(dec!(99.99), 100), 0);
        assert_eq!(points(dec!(199.99), 100), 1);
    }

    #[test]
    fn test_negative_amount_clamped_to_zero() {
        assert_eq!(points(dec!(-500), 100), 0);
        assert_eq!(points(Decimal::ZERO, 100), 0);
    }

    #[test]
    fn test_unrepresentable_quotient() {
        let result = FloorCalculator.calculate_from_amount(Decimal::MAX, rate(1));
        assert!(matches!(result, Err(ValueError::PointsUnrepresentable(_))));
    }

    #[test]
    fn test_total_points_sums_per_transaction() {
        // 1 + 1 + 3; flooring the combined 699.99 would give 6
        let txs = vec![tx(dec!(150)), tx(dec!(199.99)), tx(dec!(350))];
        let total = FloorCalculator
            .calculate_total_points(&txs, rate(100))
            .unwrap();
        assert_eq!(total.value(), 5);
    }

    #[test]
    fn test_total_points_per_transaction_floor() {
        let txs = vec![tx(dec!(99.99)), tx(dec!(99.99))];
        let total = FloorCalculator
            .calculate_total_points(&txs, rate(100))
            .unwrap();
        assert_eq!(total.value(), 0);
    }

    #[test]
    fn test_total_points_empty() {
        let txs: Vec<VerifiedTransaction> = Vec::new();
        let total = FloorCalculator
            .calculate_total_points(&txs, rate(100))
            .unwrap();
        assert!(total.is_zero());
    }

    #[test]
    fn test_total_points_overflow() {
        let big = Decimal::from(i64::MAX);
        let txs = vec![tx(big), tx(big)];
        let result = FloorCalculator.calculate_total_points(&txs, rate(1));
        assert!(matches!(result, Err(ValueError::PointsOverflow { .. })));
    }
}
