//! Repository Errors
//!
//! Error types for points account persistence.

use std::fmt;

use crate::domain::{AccountId, DomainError, MemberId};

/// How an account was looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountLookup {
    Account(AccountId),
    Member(MemberId),
}

impl fmt::Display for AccountLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountLookup::Account(id) => write!(f, "account {}", id),
            AccountLookup::Member(id) => write!(f, "member {}", id),
        }
    }
}

/// Errors that can occur in a points account repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No row for the requested identity
    #[error("Points account not found for {0}")]
    NotFound(AccountLookup),

    /// The account id or its member already has a row
    #[error("Points account already exists: account {account_id}, member {member_id}")]
    AlreadyExists {
        account_id: AccountId,
        member_id: MemberId,
    },

    /// Optimistic lock lost: the stored version moved on since the read
    #[error("Concurrent modification of account {account_id}: expected version {expected_version}")]
    ConcurrentModification {
        account_id: AccountId,
        expected_version: i64,
    },

    /// Stored row failed reconstruction
    #[error("Stored points account is corrupted: {0}")]
    Corrupted(#[source] DomainError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Check if this error is an optimistic concurrency conflict
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, RepositoryError::ConcurrentModification { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}
