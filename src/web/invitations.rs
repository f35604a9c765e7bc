//! Invitation HTTP handlers (admin invites user into a room).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::data;
use crate::data::ids::{InvitationId, RoomId};
use crate::data::models::Invitation;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;
use crate::web::rooms::TargetUser;

/// Body for accepting or declining an open invitation or application.
#[derive(Debug, Deserialize)]
pub struct Confirm {
    pub accept: bool,
}

/// Answer for an invitation confirmation; `joinedRoomId` is set on accept.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub joined_room_id: Option<RoomId>,
}

/// `POST /api/rooms/{room}/invitations` -- admin only.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
    Json(body): Json<TargetUser>,
) -> Result<(StatusCode, Json<Invitation>), ApiError> {
    let invitation = data::invitations::create(user, room, body.user_id, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// `GET /api/rooms/{room}/invitations` -- admin only.
pub async fn list_for_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    Ok(Json(
        data::invitations::list_for_room(user, room, &state.db_pool).await?,
    ))
}

/// `GET /api/invitations` -- invitations addressed to the session user.
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Invitation>>, ApiError> {
    Ok(Json(
        data::invitations::list_for_user(user, &state.db_pool).await?,
    ))
}

/// `DELETE /api/invitations/{invitation}` -- the inviting room's admin
/// withdraws it.
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invitation): Path<InvitationId>,
) -> Result<StatusCode, ApiError> {
    data::invitations::cancel(user, invitation, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/invitations/{invitation}/confirm` -- invitee accepts or
/// declines.
pub async fn confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invitation): Path<InvitationId>,
    Json(body): Json<Confirm>,
) -> Result<Json<ConfirmOutcome>, ApiError> {
    let joined =
        data::invitations::confirm(user, invitation, body.accept, &state.db_pool).await?;
    Ok(Json(ConfirmOutcome {
        joined_room_id: joined,
    }))
}
