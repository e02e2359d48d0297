//! Type-safe error codes for API responses.
//!
//! Each code has a string identifier for clients (e.g. `"INVALID_QUERY"`),
//! an integer for logs and dashboards (e.g. `1013`) and a default message.
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! assert_eq!(code.default_message(), "Request validation failed");
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    ValidationError,
    InvalidUuid,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    UnprocessableEntity,
    JsonExtraction,
    BadRequest,
    /// Catalog query parameters could not be turned into a query
    InvalidQuery,
    /// Wrong email or password
    InvalidCredentials,

    // Server errors
    InternalError,
    ServiceUnavailable,

    // Collaborator errors (2000-2999)
    /// MongoDB rejected or failed an operation
    DatabaseError,
    /// The image store rejected an upload or delete
    ImageStoreError,
    /// Outbound email could not be delivered
    MailDeliveryError,

    // I/O errors (4000s)
    IoError,

    // JSON errors (5000s)
    SerdeJsonError,
}

impl ErrorCode {
    /// Identifier, integer code and default message in one table.
    ///
    /// Integer ranges: 1000s for client and generic server errors, 2000s for
    /// collaborator failures (database, image store, mail), 4000s for I/O
    /// and 5000s for serialization.
    const fn describe(self) -> (&'static str, i32, &'static str) {
        use ErrorCode::*;
        match self {
            ValidationError => ("VALIDATION_ERROR", 1001, "Request validation failed"),
            InvalidUuid => ("INVALID_UUID", 1002, "Invalid UUID format"),
            JsonExtraction => ("JSON_EXTRACTION", 1003, "Failed to parse request body"),
            NotFound => ("NOT_FOUND", 1004, "Resource not found"),
            InternalError => ("INTERNAL_ERROR", 1005, "An internal server error occurred"),
            Unauthorized => ("UNAUTHORIZED", 1006, "Authentication required"),
            Forbidden => ("FORBIDDEN", 1007, "Access forbidden"),
            Conflict => ("CONFLICT", 1008, "Resource already exists"),
            UnprocessableEntity => ("UNPROCESSABLE_ENTITY", 1009, "Request cannot be processed"),
            ServiceUnavailable => ("SERVICE_UNAVAILABLE", 1011, "Service is temporarily unavailable"),
            BadRequest => ("BAD_REQUEST", 1012, "Bad request"),
            InvalidQuery => ("INVALID_QUERY", 1013, "Invalid query parameters"),
            InvalidCredentials => ("INVALID_CREDENTIALS", 1014, "Invalid email or password"),
            DatabaseError => ("DATABASE_ERROR", 2001, "Database error occurred"),
            ImageStoreError => ("IMAGE_STORE_ERROR", 2002, "Image storage failed"),
            MailDeliveryError => ("MAIL_DELIVERY_ERROR", 2003, "Email could not be sent"),
            IoError => ("IO_ERROR", 4001, "I/O error occurred"),
            SerdeJsonError => ("SERDE_JSON_ERROR", 5001, "JSON serialization error"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.describe().0
    }

    /// Integer code used in structured logs.
    pub fn code(&self) -> i32 {
        self.describe().1
    }

    pub fn default_message(&self) -> &'static str {
        self.describe().2
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
