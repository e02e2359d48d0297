use core_config::{ConfigError, FromEnv, env_or_default, env_required};

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Credentials for the hosted image store.
#[derive(Clone)]
pub struct ImageStoreConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Overridable for self-hosted or recorded endpoints
    pub api_base: String,
}

impl std::fmt::Debug for ImageStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStoreConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl FromEnv for ImageStoreConfig {
    /// `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and
    /// `CLOUDINARY_API_SECRET` are required; `CLOUDINARY_API_BASE` is optional.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: env_required("CLOUDINARY_CLOUD_NAME")?,
            api_key: env_required("CLOUDINARY_API_KEY")?,
            api_secret: env_required("CLOUDINARY_API_SECRET")?,
            api_base: env_or_default("CLOUDINARY_API_BASE", DEFAULT_API_BASE),
        })
    }
}
