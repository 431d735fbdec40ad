//! Command Handlers module
//!
//! Handlers that orchestrate points account operations.
//! Each write handler runs a whole read-modify-write unit inside the
//! repository's transaction and retries it when it loses an optimistic lock.

mod commands;
mod deduct_handler;
mod earn_handler;
mod open_account_handler;
mod query_handler;
mod recalculate_handler;


pub use commands::*;
pub use deduct_handler::DeductPointsHandler;
pub use earn_handler::EarnPointsHandler;
pub use open_account_handler::OpenAccountHandler;
pub use query_handler::AccountQueryHandler;
pub use recalculate_handler::RecalculatePointsHandler;

use uuid::Uuid;

use crate::aggregate::{Aggregate, PointsAccount};
use crate::concurrency::{retry_on_conflict, RetryPolicy};
use crate::domain::{DomainError, MemberId, PointsAmount};
use crate::error::{AppError, AppResult};
use crate::repository::PointsAccountRepository;

impl CommandOutcome {
    /// Snapshot the committed account and drain its events
    fn drain(account: &mut PointsAccount) -> Self {
        Self {
            account: account.snapshot(),
            events: account.take_events(),
        }
    }
}

/// Parse a raw points value from a command
fn parse_amount(raw: i64) -> AppResult<PointsAmount> {
    PointsAmount::new(raw).map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))
}

/// Load the member's account, apply `mutation`, and store it, retrying the
/// whole unit on concurrent modification.
async fn modify_account<R, F>(
    repository: &R,
    policy: &RetryPolicy,
    member_id: MemberId,
    correlation_id: Uuid,
    mutation: F,
) -> AppResult<CommandOutcome>
where
    R: PointsAccountRepository,
    F: Fn(&mut PointsAccount) -> Result<(), DomainError> + Sync,
{
    let mutation = &mutation;

    retry_on_conflict(policy, move || async move {
        let mut tx = repository.begin().await?;
        let mut account = repository
            .find_by_member_id(Some(&mut tx), member_id)
            .await?;

        mutation(&mut account)?;

        repository.update(&mut tx, &mut account).await?;
        repository.commit(tx).await?;

        tracing::debug!(
            account_id = %account.id(),
            version = account.version(),
            correlation_id = %correlation_id,
            "Points account updated"
        );

        Ok::<_, AppError>(CommandOutcome::drain(&mut account))
    })
    .await
}
