mod commands;
pub mod config;
pub mod error;
pub mod models;
mod natural_sort;
pub mod providers;
pub(crate) mod scope_path;
pub mod services;
pub mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;

use commands::gallery_commands;
use config::ConfigStore;
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sd_extra_networks/thumb", get(gallery_commands::thumb))
        .route("/sd_extra_networks/metadata", get(gallery_commands::metadata))
        .route(
            "/sd_extra_networks/get-single-card",
            get(gallery_commands::get_single_card),
        )
        .route("/sd_extra_networks/pages", get(gallery_commands::pages))
        .route("/sd_extra_networks/refresh", post(gallery_commands::refresh))
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    let config = ConfigStore::new()?;
    let options = config.settings();
    let bind_address = options.bind_address.clone();

    let state = Arc::new(AppState::with_default_pages(options));
    log::info!(
        "Registered {} extra networks pages from {:?}",
        state.registry().pages().len(),
        config.settings_path()
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    log::info!("Serving extra networks gallery on http://{bind_address}");
    axum::serve(listener, router(state))
        .await
        .context("gallery server stopped unexpectedly")?;
    Ok(())
}
