//! Database operations for the `applications` table (user applies to room).
//!
//! Confirmation and cancellation use the same delete-then-check transaction
//! shape as invitations: the row is removed with `RETURNING`, the caller is
//! verified, and a failed check rolls everything back.

use sqlx::PgPool;

use crate::data::ids::{ApplicationId, RoomId, UserId};
use crate::data::models::Application;
use crate::data::{StoreError, StoreResult, is_unique_violation, rooms};

/// User applies to join a room they are not yet a member of.
pub async fn create(user: UserId, room: RoomId, pool: &PgPool) -> StoreResult<Application> {
    let mut tx = pool.begin().await?;

    if !rooms::exists(&mut *tx, room).await? {
        return Err(StoreError::NotFound("room"));
    }
    if rooms::is_member(&mut *tx, room, user).await? {
        return Err(StoreError::Conflict("already a room member"));
    }

    let application = sqlx::query_as::<_, Application>(
        r#"
        INSERT INTO applications (room_id, user_id)
        VALUES ($1, $2)
        RETURNING id, room_id, user_id, created_at
        "#,
    )
    .bind(room)
    .bind(user)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            StoreError::Conflict("an application is already open for this room")
        } else {
            err.into()
        }
    })?;

    tx.commit().await?;
    Ok(application)
}

/// Applicant withdraws their own application.
pub async fn cancel(user: UserId, application: ApplicationId, pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let application = sqlx::query_as::<_, Application>(
        "DELETE FROM applications WHERE id = $1 RETURNING id, room_id, user_id, created_at",
    )
    .bind(application)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("application"))?;

    if application.user_id != user {
        return Err(StoreError::Forbidden("not your application"));
    }

    tx.commit().await?;
    Ok(())
}

/// Open applications for a room, visible to its admin.
pub async fn list_for_room(
    admin: UserId,
    room: RoomId,
    pool: &PgPool,
) -> StoreResult<Vec<Application>> {
    let mut tx = pool.begin().await?;
    rooms::require_admin(&mut tx, room, admin).await?;

    let applications = sqlx::query_as::<_, Application>(
        r#"
        SELECT id, room_id, user_id, created_at
        FROM applications
        WHERE room_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(room)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(applications)
}

/// Applications filed by the user.
pub async fn list_for_user(user: UserId, pool: &PgPool) -> StoreResult<Vec<Application>> {
    Ok(sqlx::query_as::<_, Application>(
        r#"
        SELECT id, room_id, user_id, created_at
        FROM applications
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?)
}

/// Room admin accepts (join + delete) or rejects (delete) in one transaction.
pub async fn confirm(
    admin: UserId,
    application: ApplicationId,
    accept: bool,
    pool: &PgPool,
) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let application = sqlx::query_as::<_, Application>(
        "DELETE FROM applications WHERE id = $1 RETURNING id, room_id, user_id, created_at",
    )
    .bind(application)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("application"))?;

    rooms::require_admin(&mut tx, application.room_id, admin).await?;
    if accept {
        rooms::insert_member(&mut tx, application.room_id, application.user_id).await?;
    }

    tx.commit().await?;
    Ok(())
}
