//! pointsLedger Library
//!
//! Loyalty points accounts: accrual, deduction and recalculation under
//! optimistic concurrency.

pub mod aggregate;
pub mod concurrency;
pub mod domain;
pub mod handlers;
pub mod repository;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{DomainError, OperationContext, PointsAmount, ValueError};
pub use domain::PointsEvent;
