//! Room CRUD and membership HTTP handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::data;
use crate::data::ids::{RoomId, UserId};
use crate::data::models::{Member, Room};
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;

const MAX_ROOM_NAME_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct CreateRoom {
    pub name: String,
}

/// Body for operations that point at another user (add member, new admin).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetUser {
    pub user_id: UserId,
}

/// A room with its member list, as served by the detail endpoint.
#[derive(Debug, Serialize)]
pub struct RoomDetail {
    #[serde(flatten)]
    pub room: Room,
    pub members: Vec<Member>,
}

/// `POST /api/rooms`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateRoom>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() || name.len() > MAX_ROOM_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Room name must be 1-{MAX_ROOM_NAME_LEN} characters"
        )));
    }
    let room = data::rooms::create(user, name, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// `GET /api/rooms` -- rooms the session user belongs to.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Room>>, ApiError> {
    Ok(Json(data::rooms::list_for_user(user, &state.db_pool).await?))
}

/// `GET /api/rooms/{room}`
pub async fn get(
    State(state): State<AppState>,
    Path(room): Path<RoomId>,
) -> Result<Json<RoomDetail>, ApiError> {
    let detail = RoomDetail {
        room: data::rooms::get(room, &state.db_pool).await?,
        members: data::rooms::members(room, &state.db_pool).await?,
    };
    Ok(Json(detail))
}

/// `DELETE /api/rooms/{room}` -- admin only.
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
) -> Result<StatusCode, ApiError> {
    data::rooms::delete(user, room, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/rooms/{room}/members` -- admin adds a user directly.
pub async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
    Json(body): Json<TargetUser>,
) -> Result<StatusCode, ApiError> {
    data::rooms::add_member(user, room, body.user_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/rooms/{room}/members/{member}` -- admin removes a member.
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((room, member)): Path<(RoomId, UserId)>,
) -> Result<StatusCode, ApiError> {
    data::rooms::remove_member(user, room, member, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/rooms/{room}/admin` -- hand adminship to another member.
pub async fn change_admin(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
    Json(body): Json<TargetUser>,
) -> Result<StatusCode, ApiError> {
    data::rooms::change_admin(user, room, body.user_id, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}
