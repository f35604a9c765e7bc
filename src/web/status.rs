//! Service status handler.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use tracing::warn;

use crate::data;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    uptime_secs: u64,
    services: BTreeMap<&'static str, ServiceStatus>,
}

/// `GET /status` -- liveness plus dependency health, fit for load-balancer
/// checks. Always 200; a struggling dependency shows up as `degraded`.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let database = match data::health::ping(&state.db_pool).await {
        Ok(()) => ServiceStatus::Ok,
        Err(err) => {
            warn!(error = %err, "Database health probe failed");
            ServiceStatus::Degraded
        }
    };
    let redis = match state.kv.ping().await {
        Ok(()) => ServiceStatus::Ok,
        Err(err) => {
            warn!(error = %err, "Redis health probe failed");
            ServiceStatus::Degraded
        }
    };

    let mut services = BTreeMap::new();
    services.insert("database", database);
    services.insert("redis", redis);

    let status = if services.values().any(|s| *s == ServiceStatus::Degraded) {
        ServiceStatus::Degraded
    } else {
        ServiceStatus::Ok
    };

    Json(StatusResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        services,
    })
}
