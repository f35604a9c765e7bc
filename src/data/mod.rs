//! Database access: models, id newtypes, and query functions over `PgPool`.

pub mod applications;
pub mod health;
pub mod ids;
pub mod invitations;
pub mod messages;
pub mod models;
pub mod rooms;
pub mod stickers;
pub mod users;
pub mod wallet;

use thiserror::Error;

/// Error from the relational store.
///
/// `NotFound`, `Conflict`, and `Forbidden` are domain outcomes that map to
/// 4xx responses; `Database` and `Unexpected` are infrastructure failures
/// that surface as retryable server errors and are never swallowed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whether the error is a Postgres unique-constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
