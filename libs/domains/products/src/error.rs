use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use image_store::ImageStoreError;
use query_composer::QueryError;
use thiserror::Error;
use uuid::Uuid;

use crate::reviews::ReviewError;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(Uuid),

    #[error("Review not found: {0}")]
    ReviewNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// A conditional write lost against a concurrent writer
    #[error("Product {0} was modified concurrently")]
    VersionConflict(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Image store error: {0}")]
    ImageStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(_) => AppError::NotFound("Product not found".to_string()),
            ProductError::ReviewNotFound(_) => AppError::NotFound("Review not found".to_string()),
            ProductError::Validation(msg) => AppError::BadRequest(msg),
            ProductError::InvalidQuery(msg) => AppError::InvalidQuery(msg),
            ProductError::Forbidden(msg) => AppError::Forbidden(msg),
            ProductError::VersionConflict(id) => {
                AppError::Conflict(format!("Product {} was modified concurrently, retry", id))
            }
            ProductError::Conflict(msg) => AppError::Conflict(msg),
            ProductError::ImageStore(msg) => AppError::ImageStore(msg),
            ProductError::Database(msg) => AppError::Database(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<QueryError> for ProductError {
    fn from(err: QueryError) -> Self {
        ProductError::InvalidQuery(err.to_string())
    }
}

impl From<ReviewError> for ProductError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidArgument(msg) => ProductError::Validation(msg),
            ReviewError::NotFound(id) => ProductError::ReviewNotFound(id),
        }
    }
}

impl From<ImageStoreError> for ProductError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::InvalidInput(msg) => ProductError::Validation(msg),
            other => ProductError::ImageStore(other.to_string()),
        }
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ProductError {
    fn from(err: serde_json::Error) -> Self {
        ProductError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status(err: ProductError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        let id = Uuid::now_v7();
        assert_eq!(status(ProductError::NotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(status(ProductError::ReviewNotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(ProductError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ProductError::VersionConflict(id)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(ProductError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(ProductError::Database("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_query_error_is_bad_request() {
        let err: ProductError = QueryError::InvalidArgument("limit must be positive".into()).into();
        assert!(matches!(err, ProductError::InvalidQuery(_)));
        assert_eq!(status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_review_errors_convert() {
        let id = Uuid::now_v7();
        assert!(matches!(
            ProductError::from(ReviewError::NotFound(id)),
            ProductError::ReviewNotFound(found) if found == id
        ));
        assert!(matches!(
            ProductError::from(ReviewError::InvalidArgument("rating".into())),
            ProductError::Validation(_)
        ));
    }
}
