//! Readiness check

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use axum_helpers::{run_health_checks, HealthCheckFuture};
use mongodb::Client;
use serde_json::Value;

/// `GET /ready`: 200 while MongoDB answers a ping, 503 otherwise
pub fn router(mongo_client: Client) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(mongo_client)
}

async fn readiness_check(
    State(client): State<Client>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "mongodb",
        Box::pin(async {
            database::mongodb::check_health(&client)
                .await
                .map_err(|e| e.to_string())
        }),
    )];
    run_health_checks(checks).await
}
