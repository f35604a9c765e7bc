//! Database operations for the `messages` table.
//!
//! Sending runs inside one transaction: membership check, sticker filter,
//! insert. Reading pages by creation time with a signed size -- positive
//! reads forward (ascending) from the cursor, negative reads backward
//! (descending, newest first).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::ids::{RoomId, UserId};
use crate::data::models::Message;
use crate::data::{StoreError, StoreResult, rooms};
use crate::entitlements::{Synchronizer, filter};

/// Largest page a single read returns, either direction.
const MAX_PAGE: u64 = 100;

/// Sanitize and store a message from a room member.
pub async fn add(
    author: UserId,
    room: RoomId,
    text: &str,
    sync: &Synchronizer,
    pool: &PgPool,
) -> StoreResult<Message> {
    let mut tx = pool.begin().await?;

    if !rooms::is_member(&mut *tx, room, author).await? {
        return Err(StoreError::Forbidden("room members only"));
    }

    let content = filter::sanitize(sync, author, text).await?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (room_id, user_id, content)
        VALUES ($1, $2, $3)
        RETURNING id, room_id, user_id, content, created_at
        "#,
    )
    .bind(room)
    .bind(author)
    .bind(&content)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(message)
}

/// Page through a room's messages from a time cursor.
///
/// `size == 0` returns an empty page. The magnitude is capped at
/// [`MAX_PAGE`]. The next cursor is the `created_at` of the last row
/// returned.
pub async fn list(
    viewer: UserId,
    room: RoomId,
    cursor: DateTime<Utc>,
    size: i64,
    pool: &PgPool,
) -> StoreResult<Vec<Message>> {
    if !rooms::is_member(pool, room, viewer).await? {
        return Err(StoreError::Forbidden("room members only"));
    }
    if size == 0 {
        return Ok(Vec::new());
    }

    let limit = size.unsigned_abs().min(MAX_PAGE) as i64;
    let sql = if size > 0 {
        r#"
        SELECT id, room_id, user_id, content, created_at
        FROM messages
        WHERE room_id = $1 AND created_at > $2
        ORDER BY created_at ASC
        LIMIT $3
        "#
    } else {
        r#"
        SELECT id, room_id, user_id, content, created_at
        FROM messages
        WHERE room_id = $1 AND created_at < $2
        ORDER BY created_at DESC
        LIMIT $3
        "#
    };

    Ok(sqlx::query_as::<_, Message>(sql)
        .bind(room)
        .bind(cursor)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}
