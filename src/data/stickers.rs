//! Database operations for the sticker catalog and ownership tables.
//!
//! The catalog is immutable at runtime (seeded by migrations), so reads are
//! two flat queries stitched together in memory rather than a json-aggregate
//! query nobody can index into.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::data::ids::{Price, StickerSetId, UserId};
use crate::data::{StoreError, StoreResult, is_unique_violation};
use crate::entitlements::{EntitlementSource, Sticker, StickerSet};

/// Set rows before their stickers are attached.
#[derive(sqlx::FromRow)]
struct SetRow {
    id: StickerSetId,
    name: String,
    author: String,
    price: Price,
}

impl SetRow {
    fn into_set(self, stickers: Vec<Sticker>) -> StickerSet {
        StickerSet {
            id: self.id,
            name: self.name,
            author: self.author,
            price: self.price,
            stickers,
        }
    }
}

/// The full purchasable catalog, stickers included, ordered by set id.
pub async fn catalog(pool: &PgPool) -> StoreResult<Vec<StickerSet>> {
    let sets =
        sqlx::query_as::<_, SetRow>("SELECT id, name, author, price FROM sticker_sets ORDER BY id")
            .fetch_all(pool)
            .await?;

    let stickers = sqlx::query_as::<_, Sticker>(
        "SELECT id, sticker_set_id, name FROM stickers ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(attach(sets, stickers))
}

/// One set with its stickers, inside the caller's transaction.
pub async fn get_set(conn: &mut PgConnection, set: StickerSetId) -> StoreResult<StickerSet> {
    let row = sqlx::query_as::<_, SetRow>(
        "SELECT id, name, author, price FROM sticker_sets WHERE id = $1",
    )
    .bind(set)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(StoreError::NotFound("sticker set"))?;

    let stickers = sqlx::query_as::<_, Sticker>(
        "SELECT id, sticker_set_id, name FROM stickers WHERE sticker_set_id = $1 ORDER BY id",
    )
    .bind(set)
    .fetch_all(&mut *conn)
    .await?;

    Ok(row.into_set(stickers))
}

/// Every set the user owns, stickers included, ordered by set id.
pub async fn owned_sets(user: UserId, pool: &PgPool) -> StoreResult<Vec<StickerSet>> {
    let sets = sqlx::query_as::<_, SetRow>(
        r#"
        SELECT s.id, s.name, s.author, s.price
        FROM sticker_sets s
        JOIN sticker_ownership o ON o.sticker_set_id = s.id
        WHERE o.user_id = $1
        ORDER BY s.id
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    let stickers = sqlx::query_as::<_, Sticker>(
        r#"
        SELECT st.id, st.sticker_set_id, st.name
        FROM stickers st
        JOIN sticker_ownership o ON o.sticker_set_id = st.sticker_set_id
        WHERE o.user_id = $1
        ORDER BY st.id
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(attach(sets, stickers))
}

pub async fn is_owned(
    executor: impl sqlx::PgExecutor<'_>,
    user: UserId,
    set: StickerSetId,
) -> StoreResult<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM sticker_ownership WHERE user_id = $1 AND sticker_set_id = $2)",
    )
    .bind(user)
    .bind(set)
    .fetch_one(executor)
    .await?)
}

/// Bind a set to a user; an existing binding is a conflict.
pub async fn insert_ownership(
    conn: &mut PgConnection,
    user: UserId,
    set: StickerSetId,
) -> StoreResult<()> {
    sqlx::query("INSERT INTO sticker_ownership (user_id, sticker_set_id) VALUES ($1, $2)")
        .bind(user)
        .bind(set)
        .execute(&mut *conn)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("sticker set already owned")
            } else {
                err.into()
            }
        })?;
    Ok(())
}

/// Store-backed entitlement source for the synchronizer.
pub struct PgEntitlements {
    pool: PgPool,
}

impl PgEntitlements {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementSource for PgEntitlements {
    async fn owned_sticker_sets(&self, user: UserId) -> StoreResult<Vec<StickerSet>> {
        owned_sets(user, &self.pool).await
    }
}

fn attach(sets: Vec<SetRow>, stickers: Vec<Sticker>) -> Vec<StickerSet> {
    let mut by_set: HashMap<StickerSetId, Vec<Sticker>> = HashMap::new();
    for sticker in stickers {
        by_set.entry(sticker.sticker_set_id).or_default().push(sticker);
    }
    sets.into_iter()
        .map(|row| {
            let stickers = by_set.remove(&row.id).unwrap_or_default();
            row.into_set(stickers)
        })
        .collect()
}
