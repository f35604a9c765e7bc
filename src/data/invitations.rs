//! Database operations for the `invitations` table (admin invites user).
//!
//! Confirmation deletes the row first with `RETURNING` and only then checks
//! the caller. A failed check rolls the transaction back, so the invitation
//! survives a stranger's guess while a legitimate double-confirm still hits
//! `NotFound` on the second attempt.

use sqlx::PgPool;

use crate::data::ids::{InvitationId, RoomId, UserId};
use crate::data::models::Invitation;
use crate::data::{StoreError, StoreResult, is_unique_violation, rooms, users};

/// Admin invites a user who is not yet a member.
pub async fn create(
    admin: UserId,
    room: RoomId,
    user: UserId,
    pool: &PgPool,
) -> StoreResult<Invitation> {
    let mut tx = pool.begin().await?;

    rooms::require_admin(&mut tx, room, admin).await?;
    if !users::exists(&mut *tx, user).await? {
        return Err(StoreError::NotFound("user"));
    }
    if rooms::is_member(&mut *tx, room, user).await? {
        return Err(StoreError::Conflict("user is already a room member"));
    }

    let invitation = sqlx::query_as::<_, Invitation>(
        r#"
        INSERT INTO invitations (room_id, user_id)
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
            StoreError::Conflict("an invitation is already open for this user")
        } else {
            err.into()
        }
    })?;

    tx.commit().await?;
    Ok(invitation)
}

/// Admin withdraws an open invitation.
pub async fn cancel(admin: UserId, invitation: InvitationId, pool: &PgPool) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, Invitation>(
        "DELETE FROM invitations WHERE id = $1 RETURNING id, room_id, user_id, created_at",
    )
    .bind(invitation)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("invitation"))?;

    rooms::require_admin(&mut tx, invitation.room_id, admin).await?;

    tx.commit().await?;
    Ok(())
}

/// Open invitations for a room, visible to its admin.
pub async fn list_for_room(
    admin: UserId,
    room: RoomId,
    pool: &PgPool,
) -> StoreResult<Vec<Invitation>> {
    let mut tx = pool.begin().await?;
    rooms::require_admin(&mut tx, room, admin).await?;

    let invitations = sqlx::query_as::<_, Invitation>(
        r#"
        SELECT id, room_id, user_id, created_at
        FROM invitations
        WHERE room_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(room)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(invitations)
}

/// Invitations addressed to the user.
pub async fn list_for_user(user: UserId, pool: &PgPool) -> StoreResult<Vec<Invitation>> {
    Ok(sqlx::query_as::<_, Invitation>(
        r#"
        SELECT id, room_id, user_id, created_at
        FROM invitations
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?)
}

/// Invitee accepts (join + delete) or declines (delete) in one transaction.
pub async fn confirm(
    user: UserId,
    invitation: InvitationId,
    accept: bool,
    pool: &PgPool,
) -> StoreResult<Option<RoomId>> {
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, Invitation>(
        "DELETE FROM invitations WHERE id = $1 RETURNING id, room_id, user_id, created_at",
    )
    .bind(invitation)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(StoreError::NotFound("invitation"))?;

    if invitation.user_id != user {
        return Err(StoreError::Forbidden("not your invitation"));
    }

    let joined = if accept {
        rooms::insert_member(&mut tx, invitation.room_id, user).await?;
        Some(invitation.room_id)
    } else {
        None
    };

    tx.commit().await?;
    Ok(joined)
}
