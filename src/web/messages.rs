//! Message HTTP handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::data;
use crate::data::ids::RoomId;
use crate::data::models::Message;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;

const MAX_MESSAGE_LEN: usize = 4096;

/// Default page: the newest fifty entries, newest first.
const DEFAULT_PAGE: i64 = -50;

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub text: String,
}

/// Time-cursor paging parameters shared by messages and the wallet ledger.
///
/// `size > 0` reads forward (ascending) from the cursor, `size < 0` reads
/// backward (descending, newest first). The cursor defaults to now, the size
/// to [`DEFAULT_PAGE`]; the next cursor is the last returned row's timestamp.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub before: Option<DateTime<Utc>>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn cursor(&self) -> DateTime<Utc> {
        self.before.unwrap_or_else(Utc::now)
    }

    pub fn size(&self) -> i64 {
        self.size.unwrap_or(DEFAULT_PAGE)
    }
}

/// `POST /api/rooms/{room}/messages`
///
/// The text runs through the sticker filter before it is stored; tokens for
/// stickers the sender does not own are stripped.
pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if body.text.is_empty() || body.text.len() > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "Message must be 1-{MAX_MESSAGE_LEN} bytes"
        )));
    }

    let message = data::messages::add(
        user,
        room,
        &body.text,
        &state.entitlements,
        &state.db_pool,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /api/rooms/{room}/messages?before=&size=` -- member only.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room): Path<RoomId>,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(
        data::messages::list(user, room, page.cursor(), page.size(), &state.db_pool).await?,
    ))
}
