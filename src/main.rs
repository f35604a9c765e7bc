use clap::Parser;
use std::process::ExitCode;
use tracing::info;

use crate::app::App;
use crate::cli::Args;
use crate::config::Config;
use crate::logging::setup_logging;

mod app;
mod cache;
mod cli;
mod config;
mod data;
mod entitlements;
mod logging;
mod service;
mod state;
mod web;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and set up logging before App::new() so startup logs are never silently dropped
    let mut config = Config::load().expect("Failed to load config");
    if let Some(port) = args.port {
        config.port = port;
    }
    setup_logging(&config, args.json_logs || config.json_logs);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting parlor"
    );

    let app = App::new(config).await.expect("Failed to initialize application");
    app.run().await
}
