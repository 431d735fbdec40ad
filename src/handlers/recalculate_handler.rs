//! Recalculate Points Handler
//!
//! Restates a member's earned total from their verified transactions.

use std::sync::Arc;

use crate::concurrency::RetryPolicy;
use crate::domain::{OperationContext, PointsCalculator};
use crate::error::AppError;
use crate::repository::PointsAccountRepository;

use super::{modify_account, CommandOutcome, RecalculatePointsCommand};

/// Handler for points recalculation
pub struct RecalculatePointsHandler<R, C> {
    repository: Arc<R>,
    calculator: C,
    retry_policy: RetryPolicy,
}

impl<R, C> RecalculatePointsHandler<R, C>
where
    R: PointsAccountRepository,
    C: PointsCalculator + Sync,
{
    pub fn new(repository: Arc<R>, calculator: C, retry_policy: RetryPolicy) -> Self {
        Self {
            repository,
            calculator,
            retry_policy,
        }
    }

    /// Execute the recalculate command
    ///
    /// The context's actor, if any, is recorded as `triggered_by`.
    pub async fn execute(
        &self,
        command: RecalculatePointsCommand,
        context: &OperationContext,
    ) -> Result<CommandOutcome, AppError> {
        let transactions = command.effective_transactions();
        let correlation_id = context.clone().ensure_correlation_id();
        let calculator = &self.calculator;

        let outcome = modify_account(
            self.repository.as_ref(),
            &self.retry_policy,
            command.member_id,
            correlation_id,
            |account| {
                account.recalculate_points(
                    &transactions,
                    calculator,
                    command.rate,
                    command.reason.as_str(),
                    context.actor_id.clone(),
                )
            },
        )
        .await?;

        tracing::info!(
            account_id = %outcome.account.account_id,
            transactions = transactions.len(),
            earned = %outcome.account.earned_points,
            actor = ?context.actor_id,
            correlation_id = %correlation_id,
            "Points recalculated"
        );

        Ok(outcome)
    }
}
