//! Application configuration.
//!
//! Values come from the environment: bare names (`DATABASE_URL`, `PORT`, ...)
//! with `PARLOR_`-prefixed variables taking precedence, nested fields joined
//! by `__` (`PARLOR_RATE_LIMIT__REPEAT__MAX`). `.env` is loaded before this
//! runs.

use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;

/// One fixed-window rate-limit budget.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitTier {
    pub max: u32,
    pub window_secs: u64,
}

/// Budgets for the three limiter tiers.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// Per-client budget on a single path.
    pub repeat: RateLimitTier,
    /// Per-client budget across all paths.
    pub ip: RateLimitTier,
    /// Whole-service ceiling.
    pub global: RateLimitTier,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            repeat: RateLimitTier {
                max: 10,
                window_secs: 10,
            },
            ip: RateLimitTier {
                max: 60,
                window_secs: 60,
            },
            global: RateLimitTier {
                max: 1000,
                window_secs: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string. Required.
    pub database_url: String,
    /// Redis connection string. Required.
    pub redis_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Lifetime of cached entitlement snapshots.
    #[serde(default = "default_entitlement_ttl")]
    pub entitlement_ttl_minutes: u64,
    /// Idle lifetime of a login session; refreshed on every request.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    4000
}

fn default_entitlement_ttl() -> u64 {
    60
}

fn default_session_ttl() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Figment::new()
            .merge(Env::raw())
            .merge(Env::prefixed("PARLOR_").split("__"))
            .extract()
            .context("Failed to load config")
    }
}
