use super::config::JwtConfig;
use crate::errors::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Display name, copied onto reviews
    pub name: String,
    /// Role snapshot taken at login
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl JwtClaims {
    /// Subject parsed as a user id.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Token subject is not a user id".to_string()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// `Forbidden` unless the token carries at least one of `roles`.
    pub fn require_any_role(&self, roles: &[&str]) -> Result<(), AppError> {
        if roles.iter().any(|role| self.has_role(role)) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role ({}) is not allowed to access this resource",
                self.roles.join(", ")
            )))
        }
    }
}

/// Claims placed in request extensions by [`super::optional_jwt_auth_middleware`].
/// Missing claims reject with 401.
impl<S> FromRequestParts<S> for JwtClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<JwtClaims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Login first to access this resource".to_string()))
    }
}

/// Stateless HS256 token issuer and verifier.
#[derive(Clone)]
pub struct JwtAuth {
    secret: Arc<str>,
    ttl_secs: i64,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        tracing::info!(ttl_secs = config.ttl_secs, "JWT auth initialized");
        Self {
            secret: Arc::from(config.secret.as_str()),
            ttl_secs: config.ttl_secs,
        }
    }

    /// Lifetime of issued tokens, also used as the cookie `Max-Age`.
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn create_token(
        &self,
        user_id: &str,
        email: &str,
        name: &str,
        roles: &[String],
    ) -> eyre::Result<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            roles: roles.to_vec(),
            exp: (now + Duration::seconds(self.ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header {
            alg: Algorithm::HS256,
            ..Default::default()
        };

        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify_token(&self, token: &str) -> eyre::Result<JwtClaims> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new(&JwtConfig::new("this-is-a-valid-secret-with-32-chars!"))
    }

    #[test]
    fn test_token_round_trip_keeps_claims() {
        let auth = auth();
        let id = Uuid::new_v4();
        let token = auth
            .create_token(&id.to_string(), "a@b.io", "Ann", &["admin".to_string()])
            .unwrap();

        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.email, "a@b.io");
        assert!(claims.has_role("admin"));
        assert_eq!(claims.exp - claims.iat, auth.ttl_secs());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = auth().create_token("u", "a@b.io", "Ann", &[]).unwrap();
        let other = JwtAuth::new(&JwtConfig::new("another-secret-that-is-32-chars-long!!"));
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = JwtAuth::new(
            &JwtConfig::new("this-is-a-valid-secret-with-32-chars!").with_ttl_secs(-3600),
        );
        let token = auth.create_token("u", "a@b.io", "Ann", &[]).unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn test_require_any_role() {
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            email: "v@b.io".into(),
            name: "Vee".into(),
            roles: vec!["vendor".into()],
            exp: 0,
            iat: 0,
            jti: "j".into(),
        };

        assert!(claims.require_any_role(&["admin", "vendor"]).is_ok());
        assert!(matches!(
            claims.require_any_role(&["admin"]),
            Err(AppError::Forbidden(_))
        ));
    }
}
