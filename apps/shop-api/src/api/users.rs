//! Account, session and user administration routes

use axum::Router;
use domain_users::{handlers, MongoUserRepository, SessionSettings, UserService};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let repository = MongoUserRepository::new(&state.db);
    let service = UserService::new(repository, state.mailer.clone(), state.images.clone());
    let settings = SessionSettings {
        reset_base_url: state.config.reset_base_url(),
        secure_cookies: state.config.environment.use_https(),
    };
    handlers::router(service, state.auth.clone(), settings)
}

pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    MongoUserRepository::new(&state.db).init_indexes().await?;
    Ok(())
}
