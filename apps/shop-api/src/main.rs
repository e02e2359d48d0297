use axum::Router;
use axum_helpers::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(database = %config.mongodb.database(), "Connecting to MongoDB");
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;

    let state = AppState::new(config, mongo_client)?;
    api::init_indexes(&state).await?;

    let app = build_router(&state);
    let server = state.config.server.clone();
    let mongo_client = state.mongo_client.clone();

    info!(
        mailer = state.mailer.name(),
        images = state.images.name(),
        "Starting Shop API"
    );

    create_production_app(app, &server, async move {
        info!("Shutting down: closing MongoDB connections");
        mongo_client.shutdown().await;
        info!("MongoDB connection closed");
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Shop API shutdown complete");
    Ok(())
}

/// API under `/api`, docs, and the `/health` and `/ready` endpoints
fn build_router(state: &AppState) -> Router {
    create_router::<openapi::ApiDoc>(api::routes(state), &state.config.cors)
        .merge(health_router(state.config.app))
        .merge(api::health::router(state.mongo_client.clone()))
}
