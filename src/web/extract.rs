//! Request extractors.

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::data::ids::UserId;
use crate::web::error::ApiError;

/// The authenticated user, injected into request extensions by the session
/// middleware.
///
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser, ...) -> ... { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(ApiError::unauthorized)
    }
}
