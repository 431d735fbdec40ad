//! Deduct Points Handler

use std::sync::Arc;

use crate::concurrency::RetryPolicy;
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::repository::PointsAccountRepository;

use super::{modify_account, parse_amount, CommandOutcome, DeductPointsCommand};

/// Handler for spending points
pub struct DeductPointsHandler<R> {
    repository: Arc<R>,
    retry_policy: RetryPolicy,
}

impl<R: PointsAccountRepository> DeductPointsHandler<R> {
    pub fn new(repository: Arc<R>, retry_policy: RetryPolicy) -> Self {
        Self {
            repository,
            retry_policy,
        }
    }

    /// Execute the deduct points command
    ///
    /// An insufficient balance is a business rule failure and is returned
    /// as-is; only version conflicts are retried.
    pub async fn execute(
        &self,
        command: DeductPointsCommand,
        context: &OperationContext,
    ) -> Result<CommandOutcome, AppError> {
        let amount = parse_amount(command.amount)?;
        let correlation_id = context.clone().ensure_correlation_id();

        let outcome = modify_account(
            self.repository.as_ref(),
            &self.retry_policy,
            command.member_id,
            correlation_id,
            |account| account.deduct_points(amount, command.reason.as_str()),
        )
        .await?;

        tracing::info!(
            account_id = %outcome.account.account_id,
            amount = %amount,
            available = %outcome.account.available_points,
            correlation_id = %correlation_id,
            "Points deducted"
        );

        Ok(outcome)
    }
}
