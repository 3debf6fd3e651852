//! Set-Sleuth: identify the track that is playing, once or continuously.

mod app;
mod app_command;
mod config;
mod error;
mod status_line;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
};

use crate::config::Config;

use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "set_sleuth=debug,set_sleuth_core=debug";

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let app = match App::new(&config) {
            Ok(app) => app,
            Err(e) => {
                error!("Failed to start session: {:?}", e);
                std::process::exit(1);
            }
        };

        if let Err(e) = app.run().await {
            error!(error = ?e, "App error");
        }
    });
}
