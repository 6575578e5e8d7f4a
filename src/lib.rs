pub mod access;
pub mod api;
pub mod audit;
pub mod auth;
pub mod clinical;
pub mod config;
pub mod consent;
pub mod core_state;
pub mod db;
pub mod error;
pub mod identity;
pub mod lab;
pub mod models;

#[cfg(test)]
pub mod testutil;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub async fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let data_dir = config::app_data_dir();
    std::fs::create_dir_all(&data_dir).expect("Cannot create data directory");

    let core = Arc::new(
        core_state::CoreState::open(&config::database_path()).expect("Cannot open database"),
    );

    api::server::serve(core, config::bind_addr())
        .await
        .expect("error while running Carnet");
}
