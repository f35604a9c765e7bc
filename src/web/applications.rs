//! Application HTTP handlers (user applies to join a room).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::data;
use crate::data::ids::{ApplicationId, RoomId};
use crate::data::models::Application;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;
use crate::web::invitations::Confirm;

/// `POST /api/rooms/{room}/applications`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let application = data::applications::create(user, room, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /api/rooms/{room}/applications` -- admin only.
pub async fn list_for_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
) -> Result<Json<Vec<Application>>, ApiError> {
    Ok(Json(
        data::applications::list_for_room(user, room, &state.db_pool).await?,
    ))
}

/// `GET /api/applications` -- applications filed by the session user.
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Application>>, ApiError> {
    Ok(Json(
        data::applications::list_for_user(user, &state.db_pool).await?,
    ))
}

/// `DELETE /api/applications/{application}` -- applicant withdraws it.
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(application): Path<ApplicationId>,
) -> Result<StatusCode, ApiError> {
    data::applications::cancel(user, application, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/applications/{application}/confirm` -- the room's admin accepts
/// or rejects.
pub async fn confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(application): Path<ApplicationId>,
    Json(body): Json<Confirm>,
) -> Result<StatusCode, ApiError> {
    data::applications::confirm(user, application, body.accept, &state.db_pool).await?;
    Ok(StatusCode::NO_CONTENT)
}
