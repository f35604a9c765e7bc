//! Inbound HTTP rate limiting with fixed windows in the shared cache.
//!
//! Three tiers evaluated in order (first rejection wins):
//!
//! 1. **Repeat** -- per-client, per-path; catches hammering one endpoint
//! 2. **Client** -- per-client across all paths
//! 3. **Global** -- whole-service ceiling
//!
//! Each tier is an `INCR` on a windowed counter key; the first hit in a
//! window stamps the TTL. Counters live in the cache backend so every
//! replica enforces the same budgets. If the backend cannot be reached the
//! request is rejected with a 500 rather than waved through.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};
use tracing::{error, warn};

use crate::cache::{Kv, KvError};
use crate::config::{RateLimitConfig, RateLimitTier};

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Allow,
    /// Over budget; retry after this many seconds.
    Limit(u64),
}

/// Windowed request counters shared through the cache backend.
pub struct RateLimiter {
    kv: Arc<dyn Kv>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(kv: Arc<dyn Kv>, config: RateLimitConfig) -> Self {
        Self { kv, config }
    }

    /// Count this request against every tier, stopping at the first one over
    /// budget. The reported retry time is the tier's window length; the
    /// actual remaining window may be shorter.
    async fn check(&self, ip: IpAddr, path: &str) -> Result<Verdict, KvError> {
        let tiers = [
            (format!("ratelimit::repeat:{ip}:{path}"), self.config.repeat),
            (format!("ratelimit::ip:{ip}"), self.config.ip),
            (String::from("ratelimit::global"), self.config.global),
        ];

        for (key, tier) in tiers {
            if let Verdict::Limit(secs) = self.bump(&key, tier).await? {
                return Ok(Verdict::Limit(secs));
            }
        }
        Ok(Verdict::Allow)
    }

    async fn bump(&self, key: &str, tier: RateLimitTier) -> Result<Verdict, KvError> {
        let count = self.kv.increment(key).await?;
        if count == 1 {
            self.kv
                .expire(key, Duration::from_secs(tier.window_secs))
                .await?;
        }
        if count > i64::from(tier.max) {
            Ok(Verdict::Limit(tier.window_secs))
        } else {
            Ok(Verdict::Allow)
        }
    }
}

// -- Tower Layer + Service --

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S, ResBody> Service<Request> for RateLimitService<S>
where
    S: Service<Request, Response = Response<ResBody>> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
    ResBody: Send + 'static,
    Body: Into<ResBody>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Take the service driven to readiness; the clone waits for the next
        // poll_ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = Arc::clone(&self.limiter);

        Box::pin(async move {
            let Some(ip) = client_ip(&req) else {
                // No forwarding header and no peer address -- nothing to key on.
                return inner.call(req).await;
            };
            let path = req.uri().path().to_string();

            match limiter.check(ip, &path).await {
                Ok(Verdict::Allow) => inner.call(req).await,
                Ok(Verdict::Limit(retry_after)) => {
                    warn!(
                        client_ip = %ip,
                        path = %path,
                        retry_after_secs = retry_after,
                        "Rate limit exceeded"
                    );
                    Ok(rate_limit_response(retry_after).map(Into::into))
                }
                Err(err) => {
                    // Backend unreachable -- reject rather than wave through.
                    error!(error = %err, "Rate limiter backend unavailable");
                    Ok(limiter_unavailable_response().map(Into::into))
                }
            }
        })
    }
}

/// Client address for limiter keying: rightmost `X-Forwarded-For` entry when
/// present, else the socket peer address.
fn client_ip(req: &Request) -> Option<IpAddr> {
    if let Some(xff) = header_str(req.headers(), "x-forwarded-for")
        && let Some(ip) = xff
            .rsplit(',')
            .next()
            .map(str::trim)
            .and_then(|s| s.parse().ok())
    {
        return Some(ip);
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn rate_limit_response(retry_after: u64) -> Response<Body> {
    let body = format!(
        r#"{{"code":"RATE_LIMITED","message":"Too many requests. Retry after {retry_after} seconds.","details":null}}"#
    );
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response.headers_mut().insert(
        "retry-after",
        HeaderValue::from_str(&retry_after.to_string()).unwrap(),
    );
    response
}

fn limiter_unavailable_response() -> Response<Body> {
    let body = r#"{"code":"INTERNAL","message":"Internal error","details":null}"#;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert("content-type", HeaderValue::from_static("application/json"));
    response
}
