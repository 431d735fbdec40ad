//! Open Account Handler
//!
//! Creates a member's points account with both counters at zero.

use std::sync::Arc;

use crate::aggregate::{Aggregate, PointsAccount};
use crate::error::AppError;
use crate::repository::PointsAccountRepository;

use super::{CommandOutcome, OpenAccountCommand};

/// Handler for opening points accounts
pub struct OpenAccountHandler<R> {
    repository: Arc<R>,
}

impl<R: PointsAccountRepository> OpenAccountHandler<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Execute the open account command
    ///
    /// Fails with `RepositoryError::AlreadyExists` (wrapped) if the member
    /// already has an account. Not retried.
    pub async fn execute(&self, command: OpenAccountCommand) -> Result<CommandOutcome, AppError> {
        let mut account = match command.account_id {
            Some(account_id) => PointsAccount::open(account_id, command.member_id)?,
            None => PointsAccount::new(command.member_id)?,
        };

        let mut tx = self.repository.begin().await?;
        self.repository.save(&mut tx, &account).await?;
        self.repository.commit(tx).await?;

        tracing::info!(
            account_id = %account.id(),
            member_id = %account.member_id(),
            "Points account opened"
        );

        Ok(CommandOutcome::drain(&mut account))
    }
}
