//! Database operations for the `rooms` and `room_members` tables.
//!
//! Admin-gated writes load the room and check the caller inside the same
//! transaction as the mutation, so a concurrent admin change cannot let a
//! stale admin through.

use sqlx::{PgConnection, PgPool};

use crate::data::ids::{RoomId, UserId};
use crate::data::models::{Member, Room};
use crate::data::users;
use crate::data::{StoreError, StoreResult, is_unique_violation};

/// Create a room with the creator as admin and sole member.
pub async fn create(admin: UserId, name: &str, pool: &PgPool) -> StoreResult<Room> {
    let mut tx = pool.begin().await?;

    let room = sqlx::query_as::<_, Room>(
        r#"
        INSERT INTO rooms (name, admin_id)
        VALUES ($1, $2)
        RETURNING id, name, admin_id, created_at
        "#,
    )
    .bind(name)
    .bind(admin)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            StoreError::Conflict("room name is already taken")
        } else {
            err.into()
        }
    })?;

    insert_member(&mut tx, room.id, admin).await?;

    tx.commit().await?;
    Ok(room)
}

/// Rooms the user is a member of, oldest first.
pub async fn list_for_user(user: UserId, pool: &PgPool) -> StoreResult<Vec<Room>> {
    Ok(sqlx::query_as::<_, Room>(
        r#"
        SELECT r.id, r.name, r.admin_id, r.created_at
        FROM rooms r
        JOIN room_members m ON m.room_id = r.id
        WHERE m.user_id = $1
        ORDER BY r.created_at
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?)
}

pub async fn get(room: RoomId, pool: &PgPool) -> StoreResult<Room> {
    sqlx::query_as::<_, Room>("SELECT id, name, admin_id, created_at FROM rooms WHERE id = $1")
        .bind(room)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::NotFound("room"))
}

pub async fn members(room: RoomId, pool: &PgPool) -> StoreResult<Vec<Member>> {
    Ok(sqlx::query_as::<_, Member>(
        r#"
        SELECT u.id, u.username
        FROM room_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.room_id = $1
        ORDER BY u.username
        "#,
    )
    .bind(room)
    .fetch_all(pool)
    .await?)
}

/// Delete a room and (via cascade) its membership, invitations,
/// applications, and messages.
pub async fn delete(admin: UserId, room: RoomId, pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    require_admin(&mut tx, room, admin).await?;
    sqlx::query("DELETE FROM rooms WHERE id = $1")
        .bind(room)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Admin adds a user directly, without the invitation handshake.
pub async fn add_member(admin: UserId, room: RoomId, user: UserId, pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    require_admin(&mut tx, room, admin).await?;
    if !users::exists(&mut *tx, user).await? {
        return Err(StoreError::NotFound("user"));
    }
    insert_member(&mut tx, room, user).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn remove_member(
    admin: UserId,
    room: RoomId,
    user: UserId,
    pool: &PgPool,
) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    require_admin(&mut tx, room, admin).await?;
    if user == admin {
        return Err(StoreError::Conflict(
            "the admin cannot leave their own room; transfer adminship first",
        ));
    }

    let rows = sqlx::query("DELETE FROM room_members WHERE room_id = $1 AND user_id = $2")
        .bind(room)
        .bind(user)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(StoreError::NotFound("member"));
    }

    tx.commit().await?;
    Ok(())
}

/// Hand adminship to another member of the room.
pub async fn change_admin(
    admin: UserId,
    room: RoomId,
    new_admin: UserId,
    pool: &PgPool,
) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    require_admin(&mut tx, room, admin).await?;
    if !is_member(&mut *tx, room, new_admin).await? {
        return Err(StoreError::Conflict("the new admin must be a room member"));
    }
    sqlx::query("UPDATE rooms SET admin_id = $1 WHERE id = $2")
        .bind(new_admin)
        .bind(room)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Load the room and check the caller is its admin.
pub(crate) async fn require_admin(
    conn: &mut PgConnection,
    room: RoomId,
    caller: UserId,
) -> StoreResult<Room> {
    let room =
        sqlx::query_as::<_, Room>("SELECT id, name, admin_id, created_at FROM rooms WHERE id = $1")
            .bind(room)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(StoreError::NotFound("room"))?;
    if room.admin_id != caller {
        return Err(StoreError::Forbidden("room admin only"));
    }
    Ok(room)
}

pub(crate) async fn exists(executor: impl sqlx::PgExecutor<'_>, room: RoomId) -> StoreResult<bool> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM rooms WHERE id = $1)")
            .bind(room)
            .fetch_one(executor)
            .await?,
    )
}

pub(crate) async fn is_member(
    executor: impl sqlx::PgExecutor<'_>,
    room: RoomId,
    user: UserId,
) -> StoreResult<bool> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
    )
    .bind(room)
    .bind(user)
    .fetch_one(executor)
    .await?)
}

/// Insert a membership row; an existing one is a conflict.
pub(crate) async fn insert_member(
    conn: &mut PgConnection,
    room: RoomId,
    user: UserId,
) -> StoreResult<()> {
    sqlx::query("INSERT INTO room_members (room_id, user_id) VALUES ($1, $2)")
        .bind(room)
        .bind(user)
        .execute(&mut *conn)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("already a room member")
            } else {
                err.into()
            }
        })?;
    Ok(())
}
