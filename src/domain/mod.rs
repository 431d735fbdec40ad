//! Domain module
//!
//! Core domain types and business logic.

pub mod calculation;
pub mod context;
pub mod date_range;
pub mod error;
pub mod events;
pub mod id;
pub mod points;
pub mod schedule;
pub mod source;

pub use calculation::{CalculableTransaction, FloorCalculator, PointsCalculator, VerifiedTransaction};
pub use context::OperationContext;
pub use date_range::DateRange;
pub use error::{DomainError, ErrorKind, ValueError};
pub use events::{DomainEvent, PointsEvent};
pub use id::{AccountId, AccountKind, Id, IdKind, MemberId, MemberKind};
pub use points::{ConversionRate, PointsAmount};
pub use schedule::{ConversionRule, ConversionSchedule};
pub use source::PointsSource;
