//! Points Account Aggregate
//!
//! PointsAccount is the consistency boundary for a member's points. It owns the
//! earned and used counters and keeps `used <= earned` at every mutation.
//! Each successful command records an event; the caller drains them after
//! the change is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AccountId, CalculableTransaction, ConversionRate, DomainError, MemberId, PointsAmount,
    PointsCalculator, PointsEvent, PointsSource,
};

use super::Aggregate;

/// Persisted row shape of a points account.
///
/// Raw, unvalidated values as they come out of storage. Turn it into an
/// aggregate with [`PointsAccount::reconstruct`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAccountRecord {
    pub account_id: Uuid,
    pub member_id: Uuid,
    pub earned_points: i64,
    pub used_points: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only view of an account for read models and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub member_id: MemberId,
    pub earned_points: PointsAmount,
    pub used_points: PointsAmount,
    pub available_points: PointsAmount,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Points Account Aggregate
#[derive(Debug, Clone)]
pub struct PointsAccount {
    /// Unique account ID
    id: AccountId,

    /// Owning member, referenced by ID only
    member_id: MemberId,

    /// Total points ever accrued (or restated by recalculation)
    earned_points: PointsAmount,

    /// Total points spent
    used_points: PointsAmount,

    /// Optimistic concurrency stamp, not a business attribute
    version: i64,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Recorded, not yet drained
    pending_events: Vec<PointsEvent>,
}

impl PointsAccount {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Open a new account for `member_id` with a generated account ID.
    pub fn new(member_id: MemberId) -> Result<Self, DomainError> {
        Self::open(AccountId::generate(), member_id)
    }

    /// Open a new account with both counters at zero and record `AccountCreated`.
    ///
    /// # Errors
    /// - `DomainError::EmptyIdentity` if either ID is empty
    pub fn open(account_id: AccountId, member_id: MemberId) -> Result<Self, DomainError> {
        if account_id.is_empty() {
            return Err(DomainError::EmptyIdentity(AccountId::kind_name()));
        }
        if member_id.is_empty() {
            return Err(DomainError::EmptyIdentity(MemberId::kind_name()));
        }

        let now = Utc::now();
        let mut account = Self {
            id: account_id,
            member_id,
            earned_points: PointsAmount::zero(),
            used_points: PointsAmount::zero(),
            version: 1,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        };

        account.record(PointsEvent::AccountCreated {
            event_id: Uuid::new_v4(),
            account_id,
            member_id,
            occurred_at: now,
        });

        Ok(account)
    }

    /// Rebuild an account from stored fields.
    ///
    /// Stored data is not trusted: every invariant is checked again and any
    /// violation is reported as `DomainError::CorruptedData`. No events are
    /// recorded.
    pub fn reconstruct(record: PointsAccountRecord) -> Result<Self, DomainError> {
        let id = AccountId::from_uuid(record.account_id);
        let member_id = MemberId::from_uuid(record.member_id);

        if id.is_empty() {
            return Err(DomainError::corrupted(id, "account id is empty"));
        }
        if member_id.is_empty() {
            return Err(DomainError::corrupted(id, "member id is empty"));
        }
        if record.version < 1 {
            return Err(DomainError::corrupted(
                id,
                format!("version {} is below 1", record.version),
            ));
        }

        let earned_points = PointsAmount::new(record.earned_points)
            .map_err(|e| DomainError::corrupted(id, format!("earned points: {}", e)))?;
        let used_points = PointsAmount::new(record.used_points)
            .map_err(|e| DomainError::corrupted(id, format!("used points: {}", e)))?;

        if used_points > earned_points {
            return Err(DomainError::corrupted(
                id,
                format!(
                    "used points {} exceed earned points {}",
                    used_points, earned_points
                ),
            ));
        }

        Ok(Self {
            id,
            member_id,
            earned_points,
            used_points,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
            pending_events: Vec::new(),
        })
    }

    /// Flatten into the persisted row shape.
    pub fn to_record(&self) -> PointsAccountRecord {
        PointsAccountRecord {
            account_id: *self.id.as_uuid(),
            member_id: *self.member_id.as_uuid(),
            earned_points: self.earned_points.value(),
            used_points: self.used_points.value(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Accrue points.
    ///
    /// Zero is accepted: a zero-value invoice is still a business event.
    ///
    /// # Errors
    /// - `DomainError::PointsOverflow` if the earned counter would overflow
    pub fn earn_points(
        &mut self,
        amount: PointsAmount,
        source: PointsSource,
        source_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), DomainError> {
        let earned = self.earned_points.add(amount)?;

        self.earned_points = earned;
        let now = self.touch();
        self.record(PointsEvent::PointsEarned {
            event_id: Uuid::new_v4(),
            account_id: self.id,
            amount,
            source,
            source_id: source_id.into(),
            description: description.into(),
            occurred_at: now,
        });

        Ok(())
    }

    /// Spend points.
    ///
    /// # Errors
    /// - `DomainError::InsufficientPoints` if `amount` exceeds the available
    ///   balance; the account is left untouched
    pub fn deduct_points(
        &mut self,
        amount: PointsAmount,
        reason: impl Into<String>,
    ) -> Result<(), DomainError> {
        let reason = reason.into();
        let available = self.available_points();

        if !available.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_points(
                amount.value(),
                available.value(),
                reason,
            ));
        }

        let used = self.used_points.add(amount)?;

        self.used_points = used;
        let now = self.touch();
        self.record(PointsEvent::PointsDeducted {
            event_id: Uuid::new_v4(),
            account_id: self.id,
            amount,
            reason,
            occurred_at: now,
        });

        Ok(())
    }

    /// Restate the earned total from verified transactions.
    ///
    /// Records `PointsRecalculated`, never `PointsEarned`.
    ///
    /// # Errors
    /// - `DomainError::InsufficientEarnedAfterRecalculation` if the new total
    ///   is below the points already used; the account is left untouched
    /// - `DomainError::PointsOverflow` / `DomainError::Validation` if the
    ///   calculation itself fails
    pub fn recalculate_points<T, C>(
        &mut self,
        transactions: &[T],
        calculator: &C,
        rate: ConversionRate,
        reason: impl Into<String>,
        triggered_by: Option<String>,
    ) -> Result<(), DomainError>
    where
        T: CalculableTransaction,
        C: PointsCalculator,
    {
        let total = calculator.calculate_total_points(transactions, rate)?;
        let recalculated = PointsAmount::new(total.value())?;

        if recalculated < self.used_points {
            return Err(DomainError::InsufficientEarnedAfterRecalculation {
                recalculated: recalculated.value(),
                used: self.used_points.value(),
            });
        }

        let old_total = self.earned_points;
        self.earned_points = recalculated;
        let now = self.touch();
        self.record(PointsEvent::PointsRecalculated {
            event_id: Uuid::new_v4(),
            account_id: self.id,
            old_total,
            new_total: recalculated,
            reason: reason.into(),
            conversion_rate: rate,
            triggered_by,
            occurred_at: now,
        });

        Ok(())
    }

    // =========================================================================
    // Persistence hooks
    // =========================================================================

    /// Adopt the version a conditioned write stored.
    ///
    /// Repositories call this after a successful update so the in-memory
    /// aggregate matches the stored row.
    pub fn record_persisted_version(&mut self, version: i64) {
        self.version = version;
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn member_id(&self) -> MemberId {
        self.member_id
    }

    pub fn earned_points(&self) -> PointsAmount {
        self.earned_points
    }

    pub fn used_points(&self) -> PointsAmount {
        self.used_points
    }

    /// `earned - used`, derived on every call.
    pub fn available_points(&self) -> PointsAmount {
        // used <= earned holds at every boundary, so this never falls back
        self.earned_points
            .subtract(self.used_points)
            .unwrap_or_default()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            account_id: self.id,
            member_id: self.member_id,
            earned_points: self.earned_points,
            used_points: self.used_points,
            available_points: self.available_points(),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.updated_at = now;
        now
    }

    fn record(&mut self, event: PointsEvent) {
        self.pending_events.push(event);
    }
}

impl Aggregate for PointsAccount {
    type Id = AccountId;
    type Event = PointsEvent;

    fn aggregate_type() -> &'static str {
        "PointsAccount"
    }

    fn id(&self) -> AccountId {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn pending_events(&self) -> &[PointsEvent] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<PointsEvent> {
        std::mem::take(&mut self.pending_events)
    }
}
