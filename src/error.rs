use thiserror::Error;

use crate::db::DatabaseError;

/// Domain-level failures, recovered at the request boundary into
/// structured responses.
///
/// `NotFound` is deliberately also returned for "exists but not yours"
/// lookups (grant revocation, patient scoping) so callers cannot probe for
/// existence.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
