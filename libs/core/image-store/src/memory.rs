use crate::{ImageStore, ImageStoreError, ImageStoreResult, StoredImage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Keeps uploads in memory; URLs use the `memory://` scheme.
#[derive(Clone, Default)]
pub struct InMemoryImageStore {
    images: Arc<RwLock<HashMap<String, StoredImage>>>,
    failure: Option<String>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub async fn contains(&self, public_id: &str) -> bool {
        self.images.read().await.contains_key(public_id)
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }

    fn check_failure(&self) -> ImageStoreResult<()> {
        match &self.failure {
            Some(message) => Err(ImageStoreError::Rejected {
                status: 503,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn upload(
        &self,
        folder: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> ImageStoreResult<StoredImage> {
        self.check_failure()?;
        if bytes.is_empty() {
            return Err(ImageStoreError::InvalidInput(format!("{filename} is empty")));
        }

        let public_id = format!("{folder}/{}", Uuid::new_v4().simple());
        let image = StoredImage {
            url: format!("memory://{public_id}"),
            public_id: public_id.clone(),
        };

        self.images.write().await.insert(public_id, image.clone());
        tracing::info!(public_id = %image.public_id, "Stored image in memory");
        Ok(image)
    }

    async fn delete(&self, public_id: &str) -> ImageStoreResult<()> {
        self.check_failure()?;
        self.images.write().await.remove(public_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
