//! Domain Events
//!
//! Immutable facts that have happened to a points account. The aggregate
//! buffers them; the caller drains the buffer after a successful commit and
//! hands them to whatever dispatches notifications, audit entries and
//! read-model updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{AccountId, MemberId};
use super::points::{ConversionRate, PointsAmount};
use super::source::PointsSource;

/// Common surface of every domain event.
pub trait DomainEvent {
    fn event_id(&self) -> Uuid;

    /// Symbolic tag, stable across releases
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// Identity of the owning aggregate, as text
    fn aggregate_id(&self) -> String;
}

/// Points account events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PointsEvent {
    /// Account was opened for a member
    AccountCreated {
        event_id: Uuid,
        account_id: AccountId,
        member_id: MemberId,
        occurred_at: DateTime<Utc>,
    },

    /// Points were accrued (earned balance increased)
    PointsEarned {
        event_id: Uuid,
        account_id: AccountId,
        amount: PointsAmount,
        source: PointsSource,
        source_id: String,
        description: String,
        occurred_at: DateTime<Utc>,
    },

    /// Points were spent (used balance increased)
    PointsDeducted {
        event_id: Uuid,
        account_id: AccountId,
        amount: PointsAmount,
        reason: String,
        occurred_at: DateTime<Utc>,
    },

    /// Earned total was restated from verified transactions.
    ///
    /// Not an accrual: consumers that react only to new points
    /// (e.g. congratulation messages) must ignore it.
    PointsRecalculated {
        event_id: Uuid,
        account_id: AccountId,
        old_total: PointsAmount,
        new_total: PointsAmount,
        reason: String,
        conversion_rate: ConversionRate,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        triggered_by: Option<String>,
        occurred_at: DateTime<Utc>,
    },
}

impl PointsEvent {
    /// Get the account ID this event relates to
    pub fn account_id(&self) -> AccountId {
        match self {
            PointsEvent::AccountCreated { account_id, .. } => *account_id,
            PointsEvent::PointsEarned { account_id, .. } => *account_id,
            PointsEvent::PointsDeducted { account_id, .. } => *account_id,
            PointsEvent::PointsRecalculated { account_id, .. } => *account_id,
        }
    }

    /// True only for genuine accrual
    pub fn is_accrual(&self) -> bool {
        matches!(self, PointsEvent::PointsEarned { .. })
    }
}

impl DomainEvent for PointsEvent {
    fn event_id(&self) -> Uuid {
        match self {
            PointsEvent::AccountCreated { event_id, .. } => *event_id,
            PointsEvent::PointsEarned { event_id, .. } => *event_id,
            PointsEvent::PointsDeducted { event_id, .. } => *event_id,
            PointsEvent::PointsRecalculated { event_id, .. } => *event_id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            PointsEvent::AccountCreated { .. } => "AccountCreated",
            PointsEvent::PointsEarned { .. } => "PointsEarned",
            PointsEvent::PointsDeducted { .. } => "PointsDeducted",
            PointsEvent::PointsRecalculated { .. } => "PointsRecalculated",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PointsEvent::AccountCreated { occurred_at, .. } => *occurred_at,
            PointsEvent::PointsEarned { occurred_at, .. } => *occurred_at,
            PointsEvent::PointsDeducted { occurred_at, .. } => *occurred_at,
            PointsEvent::PointsRecalculated { occurred_at, .. } => *occurred_at,
        }
    }

    fn aggregate_id(&self) -> String {
        self.account_id().to_string()
    }
}
