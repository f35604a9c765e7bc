//! Account registration, login, and session HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::data;
use crate::data::models::User;
use crate::state::AppState;
use crate::web::error::{ApiError, ApiErrorCode};
use crate::web::extract::CurrentUser;
use crate::web::middleware::session::{clear_session_cookie, session_cookie, session_token};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

fn validate(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username must be 1-{MAX_USERNAME_LEN} characters"
        ))
        .with_details(json!({ "field": "username" })));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .with_details(json!({ "field": "password" })));
    }
    Ok(())
}

/// `POST /api/accounts/register`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let username = body.username.trim().to_owned();
    validate(&username, &body.password)?;

    let hash = hash_password(body.password).await?;
    let user = data::users::create(&username, &hash, &state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/accounts/login`
///
/// Unknown usernames and wrong passwords get the same answer so the endpoint
/// does not leak which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Response, ApiError> {
    let Some(user) = data::users::get_by_username(body.username.trim(), &state.db_pool).await?
    else {
        return Err(invalid_credentials());
    };
    if !verify_password(body.password, user.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    let token = state.sessions.create(user.id).await?;
    let cookie = session_cookie(&token, state.sessions.ttl());

    let mut response = Json(user).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal_error("Internal error"))?,
    );
    Ok(response)
}

/// `POST /api/accounts/logout`
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state.sessions.revoke(&token).await?;
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&clear_session_cookie())
            .map_err(|_| ApiError::internal_error("Internal error"))?,
    );
    Ok(response)
}

/// `GET /api/accounts/me`
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(data::users::get(user, &state.db_pool).await?))
}

fn invalid_credentials() -> ApiError {
    ApiError::new(ApiErrorCode::Unauthorized, "Invalid credentials")
}

/// Bcrypt work happens off the async runtime.
async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|err| {
            error!(error = %err, "Password hashing task failed");
            ApiError::internal_error("Internal error")
        })?
        .map_err(|err| {
            error!(error = %err, "Password hashing failed");
            ApiError::internal_error("Internal error")
        })
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| {
            error!(error = %err, "Password check task failed");
            ApiError::internal_error("Internal error")
        })?
        .map_err(|err| {
            error!(error = %err, "Password check failed");
            ApiError::internal_error("Internal error")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn error_body(err: ApiError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn credential_validation() {
        assert!(validate("alice", "longenough").is_ok());
        assert!(validate("", "longenough").is_err());
        assert!(validate(&"x".repeat(65), "longenough").is_err());
        assert!(validate("alice", "short").is_err());
    }

    #[tokio::test]
    async fn validation_failure_names_the_offending_field() {
        let body = error_body(validate("", "longenough").unwrap_err()).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["details"]["field"], "username");

        let body = error_body(validate("alice", "short").unwrap_err()).await;
        assert_eq!(body["details"]["field"], "password");
    }

    #[tokio::test]
    async fn password_round_trip() {
        let hash = hash_password("hunter2hunter2".into()).await.unwrap();
        assert!(verify_password("hunter2hunter2".into(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong-password".into(), hash).await.unwrap());
    }
}
