//! Shared application state.

use axum_helpers::JwtAuth;
use domain_users::{CapturingMailer, Mailer, SmtpMailer};
use image_store::{CloudinaryStore, ImageStore, InMemoryImageStore};
use mongodb::{Client, Database};
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;

/// Everything the routers are built from. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Shares the driver's connection pool
    pub mongo_client: Client,
    pub db: Database,
    pub auth: JwtAuth,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(config: Config, mongo_client: Client) -> eyre::Result<Self> {
        let db = mongo_client.database(config.mongodb.database());
        let auth = JwtAuth::new(&config.jwt);

        let mailer: Arc<dyn Mailer> = match &config.mail {
            Some(mail) => Arc::new(SmtpMailer::new(mail)?),
            None => {
                warn!("SMTP_HOST not set, outgoing mail is only logged");
                Arc::new(CapturingMailer::new())
            }
        };

        let images: Arc<dyn ImageStore> = match &config.images {
            Some(images) => Arc::new(CloudinaryStore::new(images.clone())),
            None => {
                warn!("Cloudinary not configured, images are kept in memory");
                Arc::new(InMemoryImageStore::new())
            }
        };

        Ok(Self {
            config,
            mongo_client,
            db,
            auth,
            mailer,
            images,
        })
    }
}
