//! Liveness probe for the database connection.

use sqlx::PgPool;

use crate::data::StoreResult;

/// Round-trip a trivial query to confirm the pool can serve connections.
pub async fn ping(pool: &PgPool) -> StoreResult<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
