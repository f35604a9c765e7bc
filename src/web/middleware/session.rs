//! Cookie-session authentication.
//!
//! Every route behind [`require_session`] expects a `parlor_session` cookie
//! holding an opaque token minted at login. The token resolves through the
//! shared [`SessionStore`](crate::cache::SessionStore); a hit also slides the
//! session's expiry window. Handlers read the resolved user through the
//! [`CurrentUser`] extractor.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use cookie::{Cookie, SameSite};
use http::HeaderMap;
use http::header::COOKIE;

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::extract::CurrentUser;

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "parlor_session";

/// Rejects the request unless it carries a live session cookie.
///
/// On success the resolved user id is inserted into request extensions, where
/// [`CurrentUser`] picks it up. Cache trouble surfaces as a 500 rather than a
/// 401 so clients do not log themselves out over a backend blip.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(req.headers()) else {
        return Err(ApiError::unauthorized());
    };
    let Some(user) = state.sessions.resolve(&token).await? else {
        return Err(ApiError::unauthorized());
    };
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// The session token carried by the request's `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    Cookie::split_parse(raw)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Serialized `Set-Cookie` value installing a session token.
///
/// The cookie is HTTP-only and scoped to the whole site; its lifetime matches
/// the server-side session window, though the store's TTL is what actually
/// ends a session.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(ttl.as_secs() as i64))
        .build()
        .to_string()
}

/// Serialized `Set-Cookie` value clearing the session cookie.
pub fn clear_session_cookie() -> String {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(cookie_line: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie_line).unwrap());
        headers
    }

    #[test]
    fn token_found_among_other_cookies() {
        let headers = headers("theme=dark; parlor_session=tok123; lang=en");
        assert_eq!(session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_header_yields_no_token() {
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn unrelated_cookies_yield_no_token() {
        let headers = headers("theme=dark; lang=en");
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn session_cookie_is_http_only_and_site_wide() {
        let value = session_cookie("tok123", Duration::from_secs(1800));
        assert!(value.starts_with("parlor_session=tok123"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Max-Age=1800"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_session_cookie();
        assert!(value.starts_with("parlor_session="));
        assert!(value.contains("Max-Age=0"));
    }
}
