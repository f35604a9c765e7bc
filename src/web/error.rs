//! API error envelope shared by every handler.
//!
//! Every failure leaves the API as `{"code", "message", "details"}` with a
//! machine-readable code, so clients switch on `code` and humans read
//! `message`. Infrastructure failures are logged here and collapsed to an
//! opaque internal error on the wire.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::cache::KvError;
use crate::data::StoreError;
use crate::service::PurchaseError;

/// Machine-readable error codes, SCREAMING_SNAKE_CASE on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    InsufficientFunds,
    AlreadyOwned,
    RateLimited,
    Internal,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::AlreadyOwned => StatusCode::CONFLICT,
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    code: ApiErrorCode,
    message: String,
    details: Option<Value>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ApiErrorCode::Unauthorized, "Authentication required")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
            "details": self.details,
        }));
        (self.code.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => {
                Self::new(ApiErrorCode::NotFound, format!("{entity} not found"))
            }
            StoreError::Conflict(message) => Self::new(ApiErrorCode::Conflict, message),
            StoreError::Forbidden(message) => Self::new(ApiErrorCode::Forbidden, message),
            StoreError::Database(err) => {
                error!(error = %err, "Database error");
                Self::internal_error("Internal error")
            }
            StoreError::Unexpected(err) => {
                error!(error = %err, "Unexpected error");
                Self::internal_error("Internal error")
            }
        }
    }
}

impl From<PurchaseError> for ApiError {
    fn from(err: PurchaseError) -> Self {
        match err {
            PurchaseError::NotFound => Self::new(ApiErrorCode::NotFound, "sticker set not found"),
            PurchaseError::InsufficientFunds => Self::new(
                ApiErrorCode::InsufficientFunds,
                "Wallet balance does not cover the price",
            ),
            PurchaseError::AlreadyOwned => {
                Self::new(ApiErrorCode::AlreadyOwned, "Sticker set already owned")
            }
            PurchaseError::Store(err) => err.into(),
        }
    }
}

impl From<KvError> for ApiError {
    fn from(err: KvError) -> Self {
        error!(error = %err, "Cache backend error");
        Self::internal_error("Internal error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ApiErrorCode::InsufficientFunds).unwrap(),
            "\"INSUFFICIENT_FUNDS\""
        );
        assert_eq!(
            serde_json::to_string(&ApiErrorCode::RateLimited).unwrap(),
            "\"RATE_LIMITED\""
        );
    }

    #[test]
    fn store_errors_map_to_their_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (StoreError::NotFound("room").into(), StatusCode::NOT_FOUND),
            (StoreError::Conflict("taken").into(), StatusCode::CONFLICT),
            (
                StoreError::Forbidden("room admin only").into(),
                StatusCode::FORBIDDEN,
            ),
            (
                StoreError::Database(sqlx::Error::RowNotFound).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn purchase_errors_map_to_their_statuses() {
        let insufficient: ApiError = PurchaseError::InsufficientFunds.into();
        assert_eq!(
            insufficient.into_response().status(),
            StatusCode::PAYMENT_REQUIRED
        );

        let owned: ApiError = PurchaseError::AlreadyOwned.into();
        assert_eq!(owned.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn database_detail_never_reaches_the_wire() {
        let err: ApiError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.message, "Internal error");
        assert!(err.details.is_none());
    }
}
