//! Wallet HTTP handlers: balance, top-up, ledger history.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::data;
use crate::data::models::WalletLogEntry;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;
use crate::web::messages::PageParams;

const MIN_CHARGE: i64 = 1;
const MAX_CHARGE: i64 = 1000;

#[derive(Debug, Serialize)]
pub struct WalletState {
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct Charge {
    pub amount: i64,
}

/// `GET /api/wallet`
pub async fn balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<WalletState>, ApiError> {
    Ok(Json(WalletState {
        balance: data::wallet::balance(user, &state.db_pool).await?,
    }))
}

/// `POST /api/wallet/charge` -- top up within per-request bounds.
pub async fn charge(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Charge>,
) -> Result<Json<WalletState>, ApiError> {
    if !(MIN_CHARGE..=MAX_CHARGE).contains(&body.amount) {
        return Err(ApiError::bad_request(format!(
            "Charge amount must be between {MIN_CHARGE} and {MAX_CHARGE}"
        )));
    }

    Ok(Json(WalletState {
        balance: data::wallet::charge(user, body.amount, &state.db_pool).await?,
    }))
}

/// `GET /api/wallet/log?before=&size=` -- same cursor convention as message
/// paging.
pub async fn log(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Vec<WalletLogEntry>>, ApiError> {
    Ok(Json(
        data::wallet::log(user, page.cursor(), page.size(), &state.db_pool).await?,
    ))
}
