use axum_helpers::{CorsConfig, JwtConfig};
use core_config::{
    app_info, env_or_default, env_parse_or, server::ServerConfig, AppInfo, ConfigError, FromEnv,
};
use database::mongodb::MongoConfig;
use domain_products::service::DEFAULT_PAGE_SIZE;
use domain_users::MailConfig;
use image_store::ImageStoreConfig;

pub use core_config::Environment;

/// Catalog listing settings
///
/// - `PRODUCTS_PER_PAGE` (default: 10) - page size when a request sends no `limit`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub products_per_page: i64,
}

impl FromEnv for CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let products_per_page = env_parse_or("PRODUCTS_PER_PAGE", DEFAULT_PAGE_SIZE)?;
        if products_per_page <= 0 {
            return Err(ConfigError::ParseError {
                key: "PRODUCTS_PER_PAGE".to_string(),
                details: format!("must be positive (got {products_per_page})"),
            });
        }
        Ok(Self { products_per_page })
    }
}

/// Application configuration, composed from the shared config structs
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub cors: CorsConfig,
    pub catalog: CatalogConfig,
    /// `None` in development without `SMTP_HOST`: mail is captured and logged
    pub mail: Option<MailConfig>,
    /// `None` in development without Cloudinary credentials: images stay in memory
    pub images: Option<ImageStoreConfig>,
    /// Base of the links in password reset emails
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();

        let mail = optional_in_development(&environment, "SMTP_HOST", MailConfig::from_env)?;
        let images = optional_in_development(
            &environment,
            "CLOUDINARY_CLOUD_NAME",
            ImageStoreConfig::from_env,
        )?;

        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?,
            mongodb: MongoConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            cors: CorsConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
            mail,
            images,
            frontend_url: env_or_default("FRONTEND_URL", "http://localhost:3000"),
            environment,
        })
    }

    /// Reset links are `{FRONTEND_URL}/password/reset/{token}`
    pub fn reset_base_url(&self) -> String {
        format!("{}/password/reset", self.frontend_url.trim_end_matches('/'))
    }
}

/// Production always loads `load`; development skips it while `marker` is unset.
fn optional_in_development<T>(
    environment: &Environment,
    marker: &str,
    load: impl FnOnce() -> Result<T, ConfigError>,
) -> Result<Option<T>, ConfigError> {
    if environment.is_development() && std::env::var(marker).is_err() {
        return Ok(None);
    }
    load().map(Some)
}
