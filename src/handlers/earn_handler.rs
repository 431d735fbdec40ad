//! Earn Points Handler

use std::sync::Arc;

use crate::concurrency::RetryPolicy;
use crate::domain::OperationContext;
use crate::error::AppError;
use crate::repository::PointsAccountRepository;

use super::{modify_account, parse_amount, CommandOutcome, EarnPointsCommand};

/// Handler for points accrual
pub struct EarnPointsHandler<R> {
    repository: Arc<R>,
    retry_policy: RetryPolicy,
}

impl<R: PointsAccountRepository> EarnPointsHandler<R> {
    pub fn new(repository: Arc<R>, retry_policy: RetryPolicy) -> Self {
        Self {
            repository,
            retry_policy,
        }
    }

    /// Execute the earn points command
    pub async fn execute(
        &self,
        command: EarnPointsCommand,
        context: &OperationContext,
    ) -> Result<CommandOutcome, AppError> {
        let amount = parse_amount(command.amount)?;
        let correlation_id = context.clone().ensure_correlation_id();

        if !command.source.is_defined() {
            return Err(AppError::InvalidRequest(
                "Points source must be specified".to_string(),
            ));
        }

        let outcome = modify_account(
            self.repository.as_ref(),
            &self.retry_policy,
            command.member_id,
            correlation_id,
            |account| {
                account.earn_points(
                    amount,
                    command.source,
                    command.source_id.as_str(),
                    command.description.as_str(),
                )
            },
        )
        .await?;

        tracing::info!(
            account_id = %outcome.account.account_id,
            amount = %amount,
            source = %command.source,
            correlation_id = %correlation_id,
            "Points earned"
        );

        Ok(outcome)
    }
}
