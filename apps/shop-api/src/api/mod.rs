//! API routes, nested under `/api` by `axum_helpers::create_router`

pub mod health;
pub mod products;
pub mod users;

use axum::Router;

use crate::state::AppState;

pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/products", products::router(state))
        .merge(users::router(state))
}

/// Create collection indexes (idempotent)
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    products::init_indexes(state).await?;
    users::init_indexes(state).await
}
