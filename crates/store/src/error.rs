//! Store error model.

use thiserror::Error;

use kitroom_core::DomainError;

/// Result type used across the persistence layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error.
///
/// Domain failures pass through typed so callers (and the HTTP boundary) can
/// map them; everything else is an unexpected database failure. In both cases
/// the surrounding transaction has already rolled back by the time the error
/// propagates (transactions roll back on drop).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// The domain failure behind this error, if it is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            StoreError::Domain(e) => Some(e),
            StoreError::Database(_) => None,
        }
    }
}
