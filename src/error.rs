//! Error handling module
//!
//! Centralized error type for the command and query handlers.

use crate::concurrency::ConflictAware;
use crate::config::ConfigError;
use crate::domain::{DomainError, ValueError};
use crate::repository::RepositoryError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    // Persistence errors
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Concurrent modification persisted after {attempts} attempts")]
    ConcurrencyExhausted { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ValueError> for AppError {
    fn from(err: ValueError) -> Self {
        AppError::Domain(err.into())
    }
}

impl AppError {
    /// Stable machine-readable code for the presentation layer
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => "invalid_value",
                DomainError::EmptyIdentity(_) => "invalid_identity",
                DomainError::InsufficientPoints { .. } => "insufficient_points",
                DomainError::InsufficientEarnedAfterRecalculation { .. } => {
                    "insufficient_earned_after_recalculation"
                }
                DomainError::PointsOverflow { .. } => "points_overflow",
                DomainError::CorruptedData { .. } => "corrupted_data",
                DomainError::OverlappingConversionRule { .. } => "overlapping_conversion_rule",
            },
            AppError::Repository(err) => match err {
                RepositoryError::NotFound(_) => "account_not_found",
                RepositoryError::AlreadyExists { .. } => "account_already_exists",
                RepositoryError::ConcurrentModification { .. } => "version_conflict",
                RepositoryError::Corrupted(_) => "corrupted_data",
                RepositoryError::Database(_) => "database_error",
            },
            AppError::ConcurrencyExhausted { .. } => "concurrency_exhausted",
            AppError::Config(_) => "config_error",
        }
    }

    /// Check if the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::InvalidRequest(_) => true,
            AppError::Domain(err) => err.is_client_error(),
            AppError::Repository(err) => {
                matches!(err, RepositoryError::NotFound(_) | RepositoryError::AlreadyExists { .. })
            }
            AppError::ConcurrencyExhausted { .. } | AppError::Config(_) => false,
        }
    }
}

impl ConflictAware for AppError {
    fn is_concurrent_modification(&self) -> bool {
        matches!(self, AppError::Repository(err) if err.is_concurrent_modification())
    }

    fn retries_exhausted(attempts: u32) -> Self {
        AppError::ConcurrencyExhausted { attempts }
    }
}
