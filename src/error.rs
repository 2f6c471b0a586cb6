use thiserror::Error;

/// Errors surfaced by store operations.
///
/// `Validation` and `Authorization` carry a human-readable reason and mean
/// the request was rejected by a domain rule; retrying unchanged will fail
/// again. `Database` wraps storage failures, which abort the enclosing
/// transaction.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
