//! Command definitions
//!
//! Commands represent intentions to change a points account.

use serde::{Deserialize, Serialize};

use crate::aggregate::AccountSnapshot;
use crate::domain::{
    AccountId, ConversionRate, ConversionSchedule, DateRange, MemberId, PointsCalculator,
    PointsEvent, PointsSource, ValueError, VerifiedTransaction,
};
use crate::error::{AppError, AppResult};

// =========================================================================
// OpenAccountCommand
// =========================================================================

/// Command to open a points account for a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub member_id: MemberId,
    /// Generated when not supplied
    pub account_id: Option<AccountId>,
}

impl OpenAccountCommand {
    pub fn new(member_id: MemberId) -> Self {
        Self {
            member_id,
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

// =========================================================================
// EarnPointsCommand
// =========================================================================

/// Command to accrue points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnPointsCommand {
    pub member_id: MemberId,
    /// Raw points, validated by the handler
    pub amount: i64,
    pub source: PointsSource,
    /// Identifier of the originating record (invoice number, survey id, ...)
    pub source_id: String,
    pub description: String,
}

impl EarnPointsCommand {
    pub fn new(
        member_id: MemberId,
        amount: i64,
        source: PointsSource,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            amount,
            source,
            source_id: source_id.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Points for a verified purchase at `rate`
    pub fn for_transaction<C: PointsCalculator>(
        member_id: MemberId,
        invoice_id: impl Into<String>,
        transaction: &VerifiedTransaction,
        rate: ConversionRate,
        calculator: &C,
    ) -> Result<Self, ValueError> {
        let points = calculator.calculate_from_amount(transaction.amount, rate)?;

        Ok(Self::new(member_id, points.value(), PointsSource::Invoice, invoice_id)
            .with_description(format!(
                "Purchase of {} on {} at {}",
                transaction.amount, transaction.effective_date, rate
            )))
    }

    /// Like [`for_transaction`](Self::for_transaction), with the rate in
    /// effect on the transaction's date
    pub fn for_scheduled_transaction<C: PointsCalculator>(
        member_id: MemberId,
        invoice_id: impl Into<String>,
        transaction: &VerifiedTransaction,
        schedule: &ConversionSchedule,
        calculator: &C,
    ) -> AppResult<Self> {
        let rate = schedule.rate_on(transaction.effective_date).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "No conversion rule covers {}",
                transaction.effective_date
            ))
        })?;

        Ok(Self::for_transaction(
            member_id,
            invoice_id,
            transaction,
            rate,
            calculator,
        )?)
    }
}

// =========================================================================
// DeductPointsCommand
// =========================================================================

/// Command to spend points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductPointsCommand {
    pub member_id: MemberId,
    /// Raw points, validated by the handler
    pub amount: i64,
    pub reason: String,
}

impl DeductPointsCommand {
    pub fn new(member_id: MemberId, amount: i64, reason: impl Into<String>) -> Self {
        Self {
            member_id,
            amount,
            reason: reason.into(),
        }
    }
}

// =========================================================================
// RecalculatePointsCommand
// =========================================================================

/// Command to restate earned points from verified transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculatePointsCommand {
    pub member_id: MemberId,
    pub transactions: Vec<VerifiedTransaction>,
    pub rate: ConversionRate,
    pub reason: String,
    /// Only transactions dated inside this window count
    pub window: Option<DateRange>,
}

impl RecalculatePointsCommand {
    pub fn new(
        member_id: MemberId,
        transactions: Vec<VerifiedTransaction>,
        rate: ConversionRate,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            member_id,
            transactions,
            rate,
            reason: reason.into(),
            window: None,
        }
    }

    pub fn within(mut self, window: DateRange) -> Self {
        self.window = Some(window);
        self
    }

    /// Transactions that fall inside the window, or all of them
    pub fn effective_transactions(&self) -> Vec<VerifiedTransaction> {
        match &self.window {
            Some(window) => self
                .transactions
                .iter()
                .filter(|t| window.contains(t.effective_date))
                .cloned()
                .collect(),
            None => self.transactions.clone(),
        }
    }
}

// =========================================================================
// Results
// =========================================================================

/// Result of a committed command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    /// Account state after the commit
    pub account: AccountSnapshot,
    /// Events recorded by the command, drained after the commit
    pub events: Vec<PointsEvent>,
}
