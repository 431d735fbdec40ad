//! Account Query Handler
//!
//! Read side: auto-commit lookups that return snapshots.

use std::sync::Arc;

use crate::aggregate::AccountSnapshot;
use crate::domain::{AccountId, MemberId};
use crate::error::AppResult;
use crate::repository::PointsAccountRepository;

pub struct AccountQueryHandler<R> {
    repository: Arc<R>,
}

impl<R: PointsAccountRepository> AccountQueryHandler<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn by_member(&self, member_id: MemberId) -> AppResult<AccountSnapshot> {
        let account = self.repository.find_by_member_id(None, member_id).await?;
        Ok(account.snapshot())
    }

    pub async fn by_account(&self, account_id: AccountId) -> AppResult<AccountSnapshot> {
        let account = self.repository.find_by_id(None, account_id).await?;
        Ok(account.snapshot())
    }
}
