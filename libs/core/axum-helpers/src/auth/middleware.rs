use super::cookie::{TOKEN_COOKIE, cookie_value};
use super::jwt::JwtAuth;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Token from `Authorization: Bearer <token>` or the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.to_string()))
        .or_else(|| {
            let cookies = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())?;
            cookie_value(cookies, TOKEN_COOKIE)
        })
        .filter(|token| !token.is_empty())
}

/// Attach verified claims to the request when a valid token is present.
///
/// Anonymous and invalid-token requests pass through untouched; handlers
/// that need a caller take [`JwtClaims`](super::JwtClaims) and reject with 401.
///
/// ```ignore
/// let app = Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(auth.clone(), optional_jwt_auth_middleware));
/// ```
pub async fn optional_jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(&headers) {
        match auth.verify_token(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(claims);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring invalid session token"),
        }
    }

    next.run(request).await
}
