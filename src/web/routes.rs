//! API router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::middleware::rate_limit::{RateLimitLayer, RateLimiter};
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::session::require_session;
use crate::web::{
    accounts, applications, invitations, messages, rooms, status, stickers, wallet,
};

/// Creates the service router.
///
/// Everything under `/api` is rate limited; everything except registration
/// and login additionally sits behind the session middleware. `/status`
/// stays outside both so health checks cannot be throttled or locked out.
pub fn create_router(state: AppState, limiter: Arc<RateLimiter>) -> Router {
    let public = Router::new()
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .with_state(state.clone());

    let session = Router::new()
        .route("/accounts/me", get(accounts::me))
        .route("/accounts/logout", post(accounts::logout))
        .route("/rooms", post(rooms::create).get(rooms::list))
        .route("/rooms/{room}", get(rooms::get).delete(rooms::delete))
        .route("/rooms/{room}/members", post(rooms::add_member))
        .route(
            "/rooms/{room}/members/{member}",
            delete(rooms::remove_member),
        )
        .route("/rooms/{room}/admin", put(rooms::change_admin))
        .route(
            "/rooms/{room}/invitations",
            post(invitations::create).get(invitations::list_for_room),
        )
        .route(
            "/rooms/{room}/applications",
            post(applications::create).get(applications::list_for_room),
        )
        .route(
            "/rooms/{room}/messages",
            post(messages::send).get(messages::list),
        )
        .route("/invitations", get(invitations::list_mine))
        .route("/invitations/{invitation}", delete(invitations::cancel))
        .route(
            "/invitations/{invitation}/confirm",
            post(invitations::confirm),
        )
        .route("/applications", get(applications::list_mine))
        .route("/applications/{application}", delete(applications::cancel))
        .route(
            "/applications/{application}/confirm",
            post(applications::confirm),
        )
        .route("/wallet", get(wallet::balance))
        .route("/wallet/charge", post(wallet::charge))
        .route("/wallet/log", get(wallet::log))
        .route("/stickers", get(stickers::catalog))
        .route("/stickers/mine", get(stickers::mine))
        .route("/stickers/{set}/buy", post(stickers::buy))
        .layer(from_fn_with_state(state.clone(), require_session))
        .with_state(state.clone());

    let api = Router::new()
        .merge(public)
        .merge(session)
        .layer(RateLimitLayer::new(limiter));

    let router = Router::new()
        .route("/status", get(status::status))
        .nest("/api", api)
        .with_state(state);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(Duration::from_secs(60)),
    ))
}
