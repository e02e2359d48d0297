//! Stateless JWT authentication.
//!
//! Tokens are HS256-signed and carried either in `Authorization: Bearer`
//! or in the `HttpOnly` session cookie. Verification needs nothing but the
//! signing secret; logging out clears the cookie.
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::auth::{JwtAuth, JwtClaims, JwtConfig, optional_jwt_auth_middleware};
//! use core_config::FromEnv;
//!
//! let auth = JwtAuth::new(&JwtConfig::from_env()?);
//!
//! async fn me(claims: JwtClaims) -> String {
//!     claims.email
//! }
//!
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(auth, optional_jwt_auth_middleware));
//! ```

pub mod config;
pub mod cookie;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use cookie::{TOKEN_COOKIE, clear_session_cookie, session_cookie};
pub use jwt::{JwtAuth, JwtClaims};
pub use middleware::{extract_token, optional_jwt_auth_middleware};
