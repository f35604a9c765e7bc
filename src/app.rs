//! Application assembly: database pool, caches, state, and the HTTP server.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cache::{Kv, RedisKv, SessionStore};
use crate::config::Config;
use crate::data::stickers::PgEntitlements;
use crate::entitlements::{EntitlementCache, Synchronizer};
use crate::state::AppState;
use crate::web;
use crate::web::middleware::rate_limit::RateLimiter;

/// Fully constructed service, ready to listen.
pub struct App {
    config: Config,
    state: AppState,
    limiter: Arc<RateLimiter>,
}

impl App {
    /// Connect to Postgres and Redis, run migrations, and build shared state.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let connect_options = PgConnectOptions::from_str(&config.database_url)
            .context("Failed to parse database URL")?
            .log_statements(tracing::log::LevelFilter::Debug)
            .log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(1));

        let db_pool = PgPoolOptions::new()
            .min_connections(0)
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(4))
            .idle_timeout(Duration::from_secs(60 * 2))
            .max_lifetime(Duration::from_secs(60 * 30))
            .connect_with(connect_options)
            .await
            .context("Failed to create database pool")?;

        info!(
            max_connections = 4,
            acquire_timeout = "4s",
            idle_timeout = "2m",
            max_lifetime = "30m",
            "database pool established"
        );

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("Failed to run database migrations")?;
        info!("database migrations complete");

        let kv: Arc<dyn Kv> = Arc::new(
            RedisKv::connect(&config.redis_url)
                .await
                .context("Failed to connect to Redis")?,
        );

        let sessions = SessionStore::new(
            kv.clone(),
            Duration::from_secs(config.session_ttl_minutes * 60),
        );
        let cache = Arc::new(EntitlementCache::new(
            kv.clone(),
            Duration::from_secs(config.entitlement_ttl_minutes * 60),
        ));
        let entitlements = Arc::new(Synchronizer::new(
            cache,
            Arc::new(PgEntitlements::new(db_pool.clone())),
        ));
        let limiter = Arc::new(RateLimiter::new(kv.clone(), config.rate_limit));

        let state = AppState::new(db_pool, kv, sessions, entitlements);

        Ok(App {
            config,
            state,
            limiter,
        })
    }

    /// Serve until shutdown, translating the outcome into an exit code.
    pub async fn run(self) -> ExitCode {
        match self.serve().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!(error = %err, "Server exited with error");
                ExitCode::FAILURE
            }
        }
    }

    async fn serve(self) -> anyhow::Result<()> {
        let router = web::create_router(self.state, self.limiter);

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(addr = %addr, "listening");

        // ConnectInfo feeds the rate limiter's peer-address fallback.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
