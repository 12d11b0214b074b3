//! Infrastructure and application-service errors.
//!
//! Storage failures are kept apart from domain failures: a `ServiceError::Domain`
//! is deterministic (retrying with the same input fails the same way), while a
//! `RepositoryError` may be transient.

use thiserror::Error;

use agenda_core::DomainError;
use agenda_events::PublishError;

/// Persistence adapter error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency check failed (stale version).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The backing store is unusable (lock poisoning, corrupt record...).
    #[error("storage failure: {0}")]
    Storage(String),

    /// A unique key (e.g. share token) is already taken.
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Error returned by application services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Publication failed after a successful write (events are lost for this call).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<PublishError> for ServiceError {
    fn from(value: PublishError) -> Self {
        ServiceError::Publish(value.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        ServiceError::Publish(format!("event serialization failed: {value}"))
    }
}

impl ServiceError {
    pub fn not_found() -> Self {
        ServiceError::Domain(DomainError::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::NotFound))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::Unauthorized))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
