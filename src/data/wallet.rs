//! Database operations for the `wallets` and `wallet_log` tables.
//!
//! Every balance mutation appends a ledger entry in the same transaction.
//! Debits are conditional (`balance >= amount`) so the non-negative balance
//! check races nothing; there is no read-then-write window.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::data::ids::UserId;
use crate::data::models::{LedgerKind, WalletLogEntry};
use crate::data::{StoreError, StoreResult};

/// Largest ledger page a single read returns, either direction.
const MAX_PAGE: u64 = 100;

pub async fn balance(user: UserId, pool: &PgPool) -> StoreResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("wallet"))
}

/// Top up the balance and append a `charge` ledger entry. Returns the new
/// balance. Amount bounds are the caller's responsibility.
pub async fn charge(user: UserId, amount: i64, pool: &PgPool) -> StoreResult<i64> {
    let mut tx = pool.begin().await?;

    let balance = sqlx::query_scalar::<_, i64>(
        "UPDATE wallets SET balance = balance + $1 WHERE user_id = $2 RETURNING balance",
    )
    .bind(amount)
    .bind(user)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("wallet"))?;

    insert_log(&mut *tx, user, LedgerKind::Charge, amount).await?;

    tx.commit().await?;
    Ok(balance)
}

/// Conditionally deduct from the balance inside the caller's transaction,
/// appending the `cost` ledger entry when the deduction happens. `false`
/// means the balance cannot cover the amount.
pub async fn debit(conn: &mut PgConnection, user: UserId, amount: i64) -> StoreResult<bool> {
    let rows = sqlx::query(
        "UPDATE wallets SET balance = balance - $1 WHERE user_id = $2 AND balance >= $1",
    )
    .bind(amount)
    .bind(user)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if rows == 0 {
        return Ok(false);
    }

    insert_log(&mut *conn, user, LedgerKind::Cost, amount).await?;
    Ok(true)
}

/// Page through the user's ledger from a time cursor; same signed-size
/// convention as message paging.
pub async fn log(
    user: UserId,
    cursor: DateTime<Utc>,
    size: i64,
    pool: &PgPool,
) -> StoreResult<Vec<WalletLogEntry>> {
    if size == 0 {
        return Ok(Vec::new());
    }

    let limit = size.unsigned_abs().min(MAX_PAGE) as i64;
    let sql = if size > 0 {
        r#"
        SELECT kind, amount, created_at
        FROM wallet_log
        WHERE user_id = $1 AND created_at > $2
        ORDER BY created_at ASC
        LIMIT $3
        "#
    } else {
        r#"
        SELECT kind, amount, created_at
        FROM wallet_log
        WHERE user_id = $1 AND created_at < $2
        ORDER BY created_at DESC
        LIMIT $3
        "#
    };

    Ok(sqlx::query_as::<_, WalletLogEntry>(sql)
        .bind(user)
        .bind(cursor)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

async fn insert_log(
    executor: impl sqlx::PgExecutor<'_>,
    user: UserId,
    kind: LedgerKind,
    amount: i64,
) -> StoreResult<()> {
    sqlx::query("INSERT INTO wallet_log (user_id, kind, amount) VALUES ($1, $2, $3)")
        .bind(user)
        .bind(kind)
        .bind(amount)
        .execute(executor)
        .await?;
    Ok(())
}
