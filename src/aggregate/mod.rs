//! Aggregate module
//!
//! Aggregate Root pattern implementation.

pub mod points_account;

pub use points_account::{AccountSnapshot, PointsAccount, PointsAccountRecord};

use crate::domain::DomainEvent;

/// Aggregate trait that all aggregates must implement
pub trait Aggregate {
    /// Strongly-typed identity
    type Id;

    /// The type of events this aggregate records
    type Event: DomainEvent;

    /// Get the aggregate type name (for storage and logs)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> Self::Id;

    /// Get the current version (optimistic concurrency stamp)
    fn version(&self) -> i64;

    /// Events recorded since the last drain
    fn pending_events(&self) -> &[Self::Event];

    /// Drain recorded events. Call once, after the change is committed.
    fn take_events(&mut self) -> Vec<Self::Event>;
}
