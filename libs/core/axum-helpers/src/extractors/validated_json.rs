//! JSON body extractor that runs `validator` rules.

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that passed its `Validate` rules.
///
/// Unparseable bodies render as `JSON_EXTRACTION`; rule violations render
/// as `400 VALIDATION_ERROR` with the field errors under `details`.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct SubmitReview {
///     #[validate(range(min = 1.0, max = 5.0))]
///     rating: f64,
/// }
///
/// async fn submit(ValidatedJson(review): ValidatedJson<SubmitReview>) -> String {
///     format!("Rated {}", review.rating)
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        data.validate()
            .map_err(|e| AppError::from(e).into_response())?;

        Ok(ValidatedJson(data))
    }
}
