//! Axum extractor for [`QueryParameters`].

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_helpers::AppError;

use crate::params::QueryParameters;

/// Parses the request's query string into [`QueryParameters`].
///
/// ```ignore
/// async fn list(QueryParams(params): QueryParams) -> String {
///     format!("{:?}", params.keyword())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QueryParams(pub QueryParameters);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) =
            Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|e| {
                AppError::BadRequest(format!("Invalid query string: {}", e.body_text()))
                    .into_response()
            })?;

        QueryParameters::from_pairs(pairs)
            .map(QueryParams)
            .map_err(|e| AppError::InvalidQuery(e.to_string()).into_response())
    }
}
