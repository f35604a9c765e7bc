//! Database operations for the `users` table and account bootstrap.

use sqlx::PgPool;

use crate::data::ids::UserId;
use crate::data::models::User;
use crate::data::{StoreError, StoreResult, is_unique_violation};

/// Create an account plus its zero-balance wallet in one transaction.
pub async fn create(username: &str, password_hash: &str, pool: &PgPool) -> StoreResult<User> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash)
        VALUES ($1, $2)
        RETURNING id, username, password_hash, created_at
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            StoreError::Conflict("username is already taken")
        } else {
            err.into()
        }
    })?;

    sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0)")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(user)
}

pub async fn get(id: UserId, pool: &PgPool) -> StoreResult<User> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound("user"))
}

/// `None` for an unknown username, so login can treat bad-username and
/// bad-password identically.
pub async fn get_by_username(username: &str, pool: &PgPool) -> StoreResult<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?)
}

pub(crate) async fn exists(executor: impl sqlx::PgExecutor<'_>, id: UserId) -> StoreResult<bool> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?,
    )
}
