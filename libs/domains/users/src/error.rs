use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use image_store::ImageStoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::mailer::MailError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error("No user registered with email '{0}'")]
    EmailNotFound(String),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Password reset token is invalid or has expired")]
    InvalidResetToken,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Email error: {0}")]
    Mail(String),

    #[error("Image store error: {0}")]
    ImageStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

/// Convert UserError to AppError for standardized error responses
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => AppError::NotFound("User not found".to_string()),
            UserError::EmailNotFound(_) => {
                AppError::NotFound("User not found with this email".to_string())
            }
            UserError::DuplicateEmail(_) => {
                AppError::Conflict("Email already registered".to_string())
            }
            UserError::InvalidCredentials => AppError::InvalidCredentials,
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::InvalidResetToken => AppError::BadRequest(
                "Password reset token is invalid or has expired".to_string(),
            ),
            UserError::PasswordHash(msg) | UserError::Internal(msg) => {
                AppError::InternalServerError(msg)
            }
            UserError::Mail(msg) => AppError::Mail(msg),
            UserError::ImageStore(msg) => AppError::ImageStore(msg),
            UserError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<MailError> for UserError {
    fn from(err: MailError) -> Self {
        UserError::Mail(err.to_string())
    }
}

impl From<ImageStoreError> for UserError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::InvalidInput(msg) => UserError::Validation(msg),
            other => UserError::ImageStore(other.to_string()),
        }
    }
}

impl From<mongodb::error::Error> for UserError {
    fn from(err: mongodb::error::Error) -> Self {
        UserError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status(err: UserError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status(UserError::NotFound(Uuid::now_v7())), StatusCode::NOT_FOUND);
        assert_eq!(
            status(UserError::EmailNotFound("a@b.io".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(UserError::DuplicateEmail("a@b.io".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status(UserError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(UserError::InvalidResetToken), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(UserError::Mail("smtp down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
