//! In-Memory Points Account Repository
//!
//! Keeps rows in a shared map. A `MemoryTx` stages writes and `commit`
//! re-checks every condition under the write lock before applying them, so
//! the conflict behaviour matches the PostgreSQL repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::aggregate::{Aggregate, PointsAccount, PointsAccountRecord};
use crate::domain::{AccountId, MemberId};

use super::{AccountLookup, PointsAccountRepository, RepositoryError};

type Rows = HashMap<Uuid, PointsAccountRecord>;

#[derive(Debug, Clone)]
enum StagedWrite {
    Insert(PointsAccountRecord),
    Update {
        record: PointsAccountRecord,
        expected_version: i64,
    },
}

impl StagedWrite {
    fn record(&self) -> &PointsAccountRecord {
        match self {
            StagedWrite::Insert(record) => record,
            StagedWrite::Update { record, .. } => record,
        }
    }
}

/// Unit of work for [`InMemoryPointsAccountRepository`]
#[derive(Debug, Default)]
pub struct MemoryTx {
    staged: Vec<StagedWrite>,
}

impl MemoryTx {
    /// Latest staged state of the row matching `predicate`
    fn staged_record<F>(&self, predicate: F) -> Option<&PointsAccountRecord>
    where
        F: Fn(&PointsAccountRecord) -> bool,
    {
        self.staged
            .iter()
            .rev()
            .map(StagedWrite::record)
            .find(|record| predicate(*record))
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// Points account repository held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPointsAccountRepository {
    rows: Arc<RwLock<Rows>>,
}

impl InMemoryPointsAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw record without validation, replacing any row with the same
    /// account id. Used to load fixtures, including deliberately bad ones.
    pub async fn import(&self, record: PointsAccountRecord) {
        self.rows.write().await.insert(record.account_id, record);
    }

    /// Stored row for `account_id`, as persisted
    pub async fn record(&self, account_id: AccountId) -> Option<PointsAccountRecord> {
        self.rows.read().await.get(account_id.as_uuid()).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn to_aggregate(record: PointsAccountRecord) -> Result<PointsAccount, RepositoryError> {
    let account_id = record.account_id;
    PointsAccount::reconstruct(record).map_err(|e| {
        tracing::error!(
            aggregate = PointsAccount::aggregate_type(),
            account_id = %account_id,
            error = %e,
            "Stored aggregate failed validation"
        );
        RepositoryError::Corrupted(e)
    })
}

fn already_exists(record: &PointsAccountRecord) -> RepositoryError {
    RepositoryError::AlreadyExists {
        account_id: AccountId::from_uuid(record.account_id),
        member_id: MemberId::from_uuid(record.member_id),
    }
}

fn ensure_vacant<'a, I>(mut existing: I, record: &PointsAccountRecord) -> Result<(), RepositoryError>
where
    I: Iterator<Item = &'a PointsAccountRecord>,
{
    if existing.any(|r| r.account_id == record.account_id || r.member_id == record.member_id) {
        return Err(already_exists(record));
    }
    Ok(())
}

fn check(rows: &Rows, write: &StagedWrite) -> Result<(), RepositoryError> {
    match write {
        StagedWrite::Insert(record) => ensure_vacant(rows.values(), record),
        StagedWrite::Update {
            record,
            expected_version,
        } => {
            let account_id = AccountId::from_uuid(record.account_id);
            let current = rows
                .get(&record.account_id)
                .ok_or(RepositoryError::NotFound(AccountLookup::Account(account_id)))?;

            if current.version != *expected_version {
                return Err(RepositoryError::ConcurrentModification {
                    account_id,
                    expected_version: *expected_version,
                });
            }
            Ok(())
        }
    }
}

#[async_trait]
impl PointsAccountRepository for InMemoryPointsAccountRepository {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError> {
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), RepositoryError> {
        if tx.is_empty() {
            return Ok(());
        }

        let mut rows = self.rows.write().await;

        // A tx stages at most one write per account, so every write can be
        // checked against the rows as they are before any is applied
        for write in &tx.staged {
            check(&rows, write)?;
        }

        let writes = tx.staged.len();
        for write in tx.staged {
            let record = match write {
                StagedWrite::Insert(record) => record,
                StagedWrite::Update { record, .. } => record,
            };
            rows.insert(record.account_id, record);
        }

        tracing::debug!(writes, "Committed in-memory transaction");
        Ok(())
    }

    async fn save(&self, tx: &mut Self::Tx, account: &PointsAccount) -> Result<(), RepositoryError> {
        let record = account.to_record();

        {
            let rows = self.rows.read().await;
            ensure_vacant(rows.values(), &record)?;
        }
        ensure_vacant(tx.staged.iter().map(StagedWrite::record), &record)?;

        tx.staged.push(StagedWrite::Insert(record));
        Ok(())
    }

    async fn find_by_id(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: AccountId,
    ) -> Result<PointsAccount, RepositoryError> {
        let key = *account_id.as_uuid();

        if let Some(staged) = tx
            .as_deref()
            .and_then(|tx| tx.staged_record(|r| r.account_id == key))
        {
            return to_aggregate(staged.clone());
        }

        let record = self
            .rows
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(RepositoryError::NotFound(AccountLookup::Account(account_id)))?;

        to_aggregate(record)
    }

    async fn find_by_member_id(
        &self,
        tx: Option<&mut Self::Tx>,
        member_id: MemberId,
    ) -> Result<PointsAccount, RepositoryError> {
        let key = *member_id.as_uuid();

        if let Some(staged) = tx
            .as_deref()
            .and_then(|tx| tx.staged_record(|r| r.member_id == key))
        {
            return to_aggregate(staged.clone());
        }

        let record = self
            .rows
            .read()
            .await
            .values()
            .find(|r| r.member_id == key)
            .cloned()
            .ok_or(RepositoryError::NotFound(AccountLookup::Member(member_id)))?;

        to_aggregate(record)
    }

    async fn update(
        &self,
        tx: &mut Self::Tx,
        account: &mut PointsAccount,
    ) -> Result<(), RepositoryError> {
        let account_id = account.id();
        let key = *account_id.as_uuid();
        let expected_version = account.version();

        let current_version = match tx.staged_record(|r| r.account_id == key) {
            Some(staged) => Some(staged.version),
            None => self.rows.read().await.get(&key).map(|r| r.version),
        };

        match current_version {
            None => return Err(RepositoryError::NotFound(AccountLookup::Account(account_id))),
            Some(version) if version != expected_version => {
                return Err(RepositoryError::ConcurrentModification {
                    account_id,
                    expected_version,
                });
            }
            Some(_) => {}
        }

        let mut record = account.to_record();
        record.version = expected_version + 1;

        // An account already written in this tx keeps its first staged form:
        // an insert stays an insert, an update keeps the version it was read at
        let position = tx.staged.iter().position(|w| w.record().account_id == key);
        let previous = position.map(|index| tx.staged.remove(index));
        let write = match previous {
            Some(StagedWrite::Insert(_)) => StagedWrite::Insert(record),
            Some(StagedWrite::Update {
                expected_version: stored_version,
                ..
            }) => StagedWrite::Update {
                record,
                expected_version: stored_version,
            },
            None => StagedWrite::Update {
                record,
                expected_version,
            },
        };
        tx.staged.push(write);

        account.record_persisted_version(expected_version + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PointsAmount, PointsSource};

    fn points(value: i64) -> PointsAmount {
        PointsAmount::new(value).unwrap()
    }

    async fn seeded(repo: &InMemoryPointsAccountRepository) -> PointsAccount {
        let mut account = PointsAccount::new(MemberId::generate()).unwrap();
        account.take_events();
        let mut tx = repo.begin().await.unwrap();
        repo.save(&mut tx, &account).await.unwrap();
        repo.commit(tx).await.unwrap();
        account
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryPointsAccountRepository::new();
        let account = seeded(&repo).await;

        let by_id = repo.find_by_id(None, account.id()).await.unwrap();
        let by_member = repo
            .find_by_member_id(None, account.member_id())
            .await
            .unwrap();

        assert_eq!(by_id.snapshot(), account.snapshot());
        assert_eq!(by_member.id(), account.id());
        assert!(by_id.pending_events().is_empty());
    }

    #[tokio::test]
    async fn test_find_missing_account() {
        let repo = InMemoryPointsAccountRepository::new();

        let err = repo.find_by_id(None, AccountId::generate()).await.unwrap_err();
        assert!(err.is_not_found());

        let err = repo
            .find_by_member_id(None, MemberId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(AccountLookup::Member(_))));
    }

    #[tokio::test]
    async fn test_save_duplicate_member_rejected() {
        let repo = InMemoryPointsAccountRepository::new();
        let existing = seeded(&repo).await;

        let duplicate = PointsAccount::new(existing.member_id()).unwrap();
        let mut tx = repo.begin().await.unwrap();
        let err = repo.save(&mut tx, &duplicate).await.unwrap_err();

        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_for_same_member_only_one_commits() {
        let repo = InMemoryPointsAccountRepository::new();
        let member_id = MemberId::generate();

        let first = PointsAccount::new(member_id).unwrap();
        let second = PointsAccount::new(member_id).unwrap();

        let mut tx1 = repo.begin().await.unwrap();
        let mut tx2 = repo.begin().await.unwrap();
        repo.save(&mut tx1, &first).await.unwrap();
        repo.save(&mut tx2, &second).await.unwrap();

        repo.commit(tx1).await.unwrap();
        let err = repo.commit(tx2).await.unwrap_err();

        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_increments_version() {
        let repo = InMemoryPointsAccountRepository::new();
        let mut account = seeded(&repo).await;

        account
            .earn_points(points(40), PointsSource::Invoice, "INV-1", "Purchase")
            .unwrap();
        let mut tx = repo.begin().await.unwrap();
        repo.update(&mut tx, &mut account).await.unwrap();
        repo.commit(tx).await.unwrap();

        assert_eq!(account.version(), 2);
        let stored = repo.record(account.id()).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.earned_points, 40);
    }

    #[tokio::test]
    async fn test_stale_update_is_concurrent_modification() {
        let repo = InMemoryPointsAccountRepository::new();
        let account = seeded(&repo).await;

        let mut first = repo.find_by_id(None, account.id()).await.unwrap();
        let mut second = repo.find_by_id(None, account.id()).await.unwrap();

        first
            .earn_points(points(50), PointsSource::Invoice, "INV-1", "first")
            .unwrap();
        let mut tx = repo.begin().await.unwrap();
        repo.update(&mut tx, &mut first).await.unwrap();
        repo.commit(tx).await.unwrap();

        second
            .earn_points(points(30), PointsSource::Invoice, "INV-2", "second")
            .unwrap();
        let mut tx = repo.begin().await.unwrap();
        let err = repo.update(&mut tx, &mut second).await.unwrap_err();

        assert!(err.is_concurrent_modification());
        assert_eq!(second.version(), 1);
        assert_eq!(repo.record(account.id()).await.unwrap().earned_points, 50);
    }

    #[tokio::test]
    async fn test_conflict_detected_at_commit() {
        let repo = InMemoryPointsAccountRepository::new();
        let account = seeded(&repo).await;

        let mut first = repo.find_by_id(None, account.id()).await.unwrap();
        let mut second = repo.find_by_id(None, account.id()).await.unwrap();

        let mut tx1 = repo.begin().await.unwrap();
        let mut tx2 = repo.begin().await.unwrap();
        repo.update(&mut tx1, &mut first).await.unwrap();
        repo.update(&mut tx2, &mut second).await.unwrap();

        repo.commit(tx1).await.unwrap();
        let err = repo.commit(tx2).await.unwrap_err();

        assert!(err.is_concurrent_modification());
        assert_eq!(repo.record(account.id()).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let repo = InMemoryPointsAccountRepository::new();
        let mut account = PointsAccount::new(MemberId::generate()).unwrap();

        let mut tx = repo.begin().await.unwrap();
        let err = repo.update(&mut tx, &mut account).await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_dropped_tx_discards_writes() {
        let repo = InMemoryPointsAccountRepository::new();
        let account = PointsAccount::new(MemberId::generate()).unwrap();

        {
            let mut tx = repo.begin().await.unwrap();
            repo.save(&mut tx, &account).await.unwrap();
        }

        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_reads_through_tx_see_staged_writes() {
        let repo = InMemoryPointsAccountRepository::new();
        let mut account = PointsAccount::new(MemberId::generate()).unwrap();

        let mut tx = repo.begin().await.unwrap();
        repo.save(&mut tx, &account).await.unwrap();
        account
            .earn_points(points(5), PointsSource::Survey, "SV-1", "survey")
            .unwrap();
        repo.update(&mut tx, &mut account).await.unwrap();

        let staged = repo
            .find_by_member_id(Some(&mut tx), account.member_id())
            .await
            .unwrap();
        assert_eq!(staged.earned_points().value(), 5);
        assert!(repo.find_by_id(None, account.id()).await.unwrap_err().is_not_found());

        repo.commit(tx).await.unwrap();
        assert_eq!(repo.record(account.id()).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_repeated_updates_in_one_tx_commit_together() {
        let repo = InMemoryPointsAccountRepository::new();
        let account = seeded(&repo).await;

        let mut tx = repo.begin().await.unwrap();
        let mut loaded = repo.find_by_id(Some(&mut tx), account.id()).await.unwrap();
        loaded
            .earn_points(points(10), PointsSource::Invoice, "INV-1", "first")
            .unwrap();
        repo.update(&mut tx, &mut loaded).await.unwrap();
        loaded
            .earn_points(points(5), PointsSource::Invoice, "INV-2", "second")
            .unwrap();
        repo.update(&mut tx, &mut loaded).await.unwrap();
        repo.commit(tx).await.unwrap();

        let stored = repo.record(account.id()).await.unwrap();
        assert_eq!(stored.earned_points, 15);
        assert_eq!(stored.version, 3);
        assert_eq!(loaded.version(), 3);
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let repo = InMemoryPointsAccountRepository::new();
        let mut stale = seeded(&repo).await;
        let mut current = repo.find_by_id(None, stale.id()).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        repo.update(&mut tx, &mut current).await.unwrap();
        repo.commit(tx).await.unwrap();

        let fresh = PointsAccount::new(MemberId::generate()).unwrap();
        stale
            .earn_points(points(20), PointsSource::Invoice, "INV-1", "stale")
            .unwrap();
        let mut tx = repo.begin().await.unwrap();
        repo.save(&mut tx, &fresh).await.unwrap();
        tx.staged.push(StagedWrite::Update {
            record: stale.to_record(),
            expected_version: stale.version(),
        });

        let err = repo.commit(tx).await.unwrap_err();
        assert!(err.is_concurrent_modification());
        assert_eq!(repo.len().await, 1);
        assert!(repo.record(fresh.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupted_row_surfaces_as_corrupted() {
        let repo = InMemoryPointsAccountRepository::new();
        let mut record = PointsAccount::new(MemberId::generate()).unwrap().to_record();
        record.earned_points = 10;
        record.used_points = 25;
        repo.import(record.clone()).await;

        let err = repo
            .find_by_id(None, AccountId::from_uuid(record.account_id))
            .await
            .unwrap_err();

        match err {
            RepositoryError::Corrupted(inner) => assert!(inner.is_corrupted_data()),
            other => panic!("Expected Corrupted, got: {:?}", other),
        }
    }
}
