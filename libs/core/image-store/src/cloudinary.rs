//! Cloudinary-compatible upload API.
//!
//! Requests are signed: the sorted `key=value` parameters joined with `&`,
//! followed by the API secret, hashed with SHA-256 and hex encoded.

use crate::{ImageStore, ImageStoreConfig, ImageStoreError, ImageStoreResult, StoredImage};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, instrument};

pub struct CloudinaryStore {
    config: ImageStoreConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: ImageStoreConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn signed_form(&self, params: &[(&str, String)]) -> Form {
        let signature = sign(params, &self.config.api_secret);
        params
            .iter()
            .fold(Form::new(), |form, (k, v)| form.text(k.to_string(), v.clone()))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
    }

    async fn rejected(response: reqwest::Response) -> ImageStoreError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        error!(status, %message, "Image store rejected request");
        ImageStoreError::Rejected { status, message }
    }
}

/// Signature over `params` (excluding `file`, `api_key` and the signature
/// itself).
pub(crate) fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    const_hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        folder: &str,
        bytes: Vec<u8>,
        filename: &str,
    ) -> ImageStoreResult<StoredImage> {
        if bytes.is_empty() {
            return Err(ImageStoreError::InvalidInput(format!("{filename} is empty")));
        }

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [("folder", folder.to_string()), ("timestamp", timestamp)];

        let form = self
            .signed_form(&params)
            .part("file", Part::bytes(bytes).file_name(filename.to_string()));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: UploadResponse = response.json().await?;
        debug!(public_id = %body.public_id, "Image uploaded");

        Ok(StoredImage {
            public_id: body.public_id,
            url: body.secure_url,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> ImageStoreResult<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [("public_id", public_id.to_string()), ("timestamp", timestamp)];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(self.signed_form(&params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: DestroyResponse = response.json().await?;
        match body.result.as_str() {
            "ok" | "not found" => {
                debug!(result = %body.result, "Image deleted");
                Ok(())
            }
            other => Err(ImageStoreError::Rejected {
                status: 200,
                message: other.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
