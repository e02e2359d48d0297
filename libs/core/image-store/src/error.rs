use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("Image request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Image store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid image: {0}")]
    InvalidInput(String),

    #[error("Image not found: {0}")]
    NotFound(String),
}

pub type ImageStoreResult<T> = Result<T, ImageStoreError>;
