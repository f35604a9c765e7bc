//! Sticker catalog, owned-set, and purchase HTTP handlers.

use axum::Json;
use axum::extract::{Path, State};

use crate::data;
use crate::data::ids::StickerSetId;
use crate::entitlements::StickerSet;
use crate::service;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;

/// `GET /api/stickers` -- the purchasable catalog, straight from the store.
pub async fn catalog(State(state): State<AppState>) -> Result<Json<Vec<StickerSet>>, ApiError> {
    Ok(Json(data::stickers::catalog(&state.db_pool).await?))
}

/// `GET /api/stickers/mine` -- the session user's owned sets.
///
/// This read goes through the entitlement cache; a cold or broken cache falls
/// back to the store and rewarms in the background.
pub async fn mine(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<StickerSet>>, ApiError> {
    let snapshot = state.entitlements.snapshot(user).await?;
    let mut sets: Vec<StickerSet> = snapshot.into_values().collect();
    sets.sort_by_key(|set| set.id);
    Ok(Json(sets))
}

/// `POST /api/stickers/{set}/buy`
pub async fn buy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(set): Path<StickerSetId>,
) -> Result<Json<StickerSet>, ApiError> {
    let set = service::buy_sticker_set(user, set, &state.entitlements, &state.db_pool).await?;
    Ok(Json(set))
}
