//! PostgreSQL Points Account Repository
//!
//! One row per account in `points_accounts`. Updates are conditioned on the
//! stored version (optimistic locking); no row locks are taken.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::aggregate::{Aggregate, PointsAccount, PointsAccountRecord};
use crate::domain::{AccountId, MemberId};

use super::{AccountLookup, PointsAccountRepository, RepositoryError};

type AccountRow = (Uuid, Uuid, i64, i64, i64, DateTime<Utc>, DateTime<Utc>);

const SELECT_BY_ACCOUNT_ID: &str = r#"
    SELECT account_id, member_id, earned_points, used_points, version, created_at, updated_at
    FROM points_accounts
    WHERE account_id = $1
"#;

const SELECT_BY_MEMBER_ID: &str = r#"
    SELECT account_id, member_id, earned_points, used_points, version, created_at, updated_at
    FROM points_accounts
    WHERE member_id = $1
"#;

/// Points account repository backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgPointsAccountRepository {
    pool: PgPool,
}

impl PgPointsAccountRepository {
    /// Create a new repository with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_row(
        &self,
        tx: Option<&mut Transaction<'static, Postgres>>,
        sql: &'static str,
        key: Uuid,
    ) -> Result<Option<AccountRow>, RepositoryError> {
        let query = sqlx::query_as::<_, AccountRow>(sql).bind(key);

        let row = match tx {
            Some(tx) => query.fetch_optional(&mut **tx).await?,
            None => query.fetch_optional(&self.pool).await?,
        };

        Ok(row)
    }

    async fn account_exists(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        account_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM points_accounts WHERE account_id = $1)
            "#,
        )
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(exists)
    }
}

fn to_aggregate(row: AccountRow) -> Result<PointsAccount, RepositoryError> {
    let (account_id, member_id, earned_points, used_points, version, created_at, updated_at) = row;

    let record = PointsAccountRecord {
        account_id,
        member_id,
        earned_points,
        used_points,
        version,
        created_at,
        updated_at,
    };

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

#[async_trait]
impl PointsAccountRepository for PgPointsAccountRepository {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), RepositoryError> {
        tx.commit().await?;
        Ok(())
    }

    async fn save(&self, tx: &mut Self::Tx, account: &PointsAccount) -> Result<(), RepositoryError> {
        let record = account.to_record();

        let result = sqlx::query(
            r#"
            INSERT INTO points_accounts (
                account_id, member_id, earned_points, used_points,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.account_id)
        .bind(record.member_id)
        .bind(record.earned_points)
        .bind(record.used_points)
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(RepositoryError::AlreadyExists {
                    account_id: account.id(),
                    member_id: account.member_id(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: AccountId,
    ) -> Result<PointsAccount, RepositoryError> {
        let row = self
            .fetch_row(tx, SELECT_BY_ACCOUNT_ID, *account_id.as_uuid())
            .await?
            .ok_or(RepositoryError::NotFound(AccountLookup::Account(account_id)))?;

        to_aggregate(row)
    }

    async fn find_by_member_id(
        &self,
        tx: Option<&mut Self::Tx>,
        member_id: MemberId,
    ) -> Result<PointsAccount, RepositoryError> {
        let row = self
            .fetch_row(tx, SELECT_BY_MEMBER_ID, *member_id.as_uuid())
            .await?
            .ok_or(RepositoryError::NotFound(AccountLookup::Member(member_id)))?;

        to_aggregate(row)
    }

    async fn update(
        &self,
        tx: &mut Self::Tx,
        account: &mut PointsAccount,
    ) -> Result<(), RepositoryError> {
        let record = account.to_record();

        let stored_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE points_accounts
            SET earned_points = $3,
                used_points = $4,
                updated_at = $5,
                version = version + 1
            WHERE account_id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(record.account_id)
        .bind(record.version)
        .bind(record.earned_points)
        .bind(record.used_points)
        .bind(record.updated_at)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(version) = stored_version {
            account.record_persisted_version(version);
            return Ok(());
        }

        // Zero rows matched: either the row is gone or its version moved on
        if self.account_exists(tx, record.account_id).await? {
            Err(RepositoryError::ConcurrentModification {
                account_id: account.id(),
                expected_version: record.version,
            })
        } else {
            Err(RepositoryError::NotFound(AccountLookup::Account(
                account.id(),
            )))
        }
    }
}
