//! Error types for moderation, reputation, and storage operations.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for steward operations.
pub type Result<T> = std::result::Result<T, ModerationError>;

/// Which submitted field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Content,
}

/// A single violated validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors surfaced to callers of the moderation and reputation core.
#[derive(Error, Debug)]
pub enum ModerationError {
    /// One or more fields failed format validation. Carries every violation.
    #[error("Validation failed: {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Submission rejected by the classifier. Terms are never included here.
    #[error("Submission contains inappropriate content")]
    Blocked,

    /// Too many submissions in the throttle window.
    #[error("Too many submissions, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A content action and its reputation delta could not be applied together.
    #[error("Ledger update failed: {0}")]
    Ledger(#[source] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concurrent modification detected through a version check.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Store(#[source] StoreError),
}

impl ModerationError {
    /// Wraps a storage failure from an operation that carries a ledger delta.
    ///
    /// Missing rows and version conflicts keep their own meaning so callers
    /// can still answer 404/409.
    pub fn from_ledger(err: StoreError) -> Self {
        match err {
            StoreError::ContentNotFound(id) => Self::NotFound(format!("content {}", id)),
            StoreError::VersionConflict { expected, actual } => Self::Conflict(format!(
                "expected reaction version {}, found {}",
                expected, actual
            )),
            other => Self::Ledger(other),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<StoreError> for ModerationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ContentNotFound(id) => Self::NotFound(format!("content {}", id)),
            StoreError::ProfileNotFound(user_id) => Self::NotFound(format!("user {}", user_id)),
            StoreError::VersionConflict { expected, actual } => Self::Conflict(format!(
                "expected reaction version {}, found {}",
                expected, actual
            )),
            other => Self::Store(other),
        }
    }
}

/// Errors raised by a [`CommunityStore`](crate::database::CommunityStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No contribution profile for user {0}")]
    ProfileNotFound(String),

    #[error("No content with id {0}")]
    ContentNotFound(uuid::Uuid),

    #[error("Reaction version mismatch: expected {expected}, found {actual}")]
    VersionConflict { expected: i64, actual: i64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}
