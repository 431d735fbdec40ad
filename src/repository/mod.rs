//! Repository module
//!
//! Persistence contract for the points account aggregate, plus an in-memory
//! and a PostgreSQL implementation.

mod error;
mod memory;
mod postgres;

pub use error::{AccountLookup, RepositoryError};
pub use memory::{InMemoryPointsAccountRepository, MemoryTx};
pub use postgres::PgPointsAccountRepository;

use async_trait::async_trait;

use crate::aggregate::PointsAccount;
use crate::domain::{AccountId, MemberId};

/// Load and store points accounts by identity.
///
/// `Tx` is the implementation's unit of work. Writes always run inside one;
/// reads take `Option<&mut Self::Tx>`, where `None` means an auto-commit read
/// and `Some` means the read joins the caller's unit of work. A `Tx` dropped
/// without [`commit`](Self::commit) discards its writes.
#[async_trait]
pub trait PointsAccountRepository: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), RepositoryError>;

    /// Insert a new account.
    ///
    /// Fails with `AlreadyExists` if the account id or its member already has
    /// a row.
    async fn save(&self, tx: &mut Self::Tx, account: &PointsAccount) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: AccountId,
    ) -> Result<PointsAccount, RepositoryError>;

    async fn find_by_member_id(
        &self,
        tx: Option<&mut Self::Tx>,
        member_id: MemberId,
    ) -> Result<PointsAccount, RepositoryError>;

    /// Store the account's current state.
    ///
    /// The write is conditioned on the stored version equalling
    /// `account.version()`; on success the stored version is incremented and
    /// the aggregate adopts it. Fails with `NotFound` if there is no row and
    /// `ConcurrentModification` if the version no longer matches.
    async fn update(&self, tx: &mut Self::Tx, account: &mut PointsAccount)
        -> Result<(), RepositoryError>;
}
