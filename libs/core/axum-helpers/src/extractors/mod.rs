//! Custom extractors for Axum handlers.
//!
//! Both reject with the shared [`ErrorResponse`](crate::errors::ErrorResponse) body.

pub mod uuid_path;
pub mod validated_json;

pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
