//! Image storage for product pictures and user avatars.
//!
//! ```text
//!   handler (multipart) ──► ImageStore::upload(folder, bytes, filename)
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!        CloudinaryStore                 InMemoryImageStore
//!   signed multipart POST (reqwest)      tests / local dev
//! ```
//!
//! Callers persist the returned [`StoredImage`] and pass its `public_id`
//! back to [`ImageStore::delete`] when the image is replaced.

mod cloudinary;
mod config;
mod error;
mod memory;

pub use cloudinary::CloudinaryStore;
pub use config::{DEFAULT_API_BASE, ImageStoreConfig};
pub use error::{ImageStoreError, ImageStoreResult};
pub use memory::InMemoryImageStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Location of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredImage {
    pub public_id: String,
    pub url: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload `bytes` into `folder` and return where it landed.
    async fn upload(
        &self,
        folder: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> ImageStoreResult<StoredImage>;

    /// Delete by `public_id`. Deleting a missing image is not an error.
    async fn delete(&self, public_id: &str) -> ImageStoreResult<()>;

    fn name(&self) -> &'static str;
}
