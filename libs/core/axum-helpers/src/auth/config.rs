use core_config::{ConfigError, FromEnv, env_parse_or, env_required};

/// Default session lifetime: 7 days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

const MIN_SECRET_LEN: usize = 32;

/// JWT signing configuration.
///
/// Loaded from environment variables:
/// - `JWT_SECRET` (required) - at least 32 characters
/// - `JWT_TTL_SECS` (default: 604800) - token and cookie lifetime in seconds
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

impl JwtConfig {
    /// Construct directly, e.g. in tests.
    ///
    /// # Panics
    /// Panics if the secret is shorter than 32 characters.
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        assert!(
            secret.len() >= MIN_SECRET_LEN,
            "JWT secret must be at least {MIN_SECRET_LEN} characters"
        );
        Self {
            secret,
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = env_required("JWT_SECRET")?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ParseError {
                key: "JWT_SECRET".to_string(),
                details: format!("must be at least {MIN_SECRET_LEN} characters, got {}", secret.len()),
            });
        }

        let ttl_secs = env_parse_or("JWT_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::ParseError {
                key: "JWT_TTL_SECS".to_string(),
                details: format!("expected a positive number of seconds, got {ttl_secs}"),
            });
        }

        Ok(Self { secret, ttl_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "shop-session-secret-thirty-two-chars";

    #[test]
    #[should_panic(expected = "at least 32 characters")]
    fn test_new_rejects_short_secret() {
        JwtConfig::new("short");
    }

    #[test]
    fn test_from_env_reads_secret_and_ttl() {
        temp_env::with_vars(
            [("JWT_SECRET", Some(SECRET)), ("JWT_TTL_SECS", Some("3600"))],
            || {
                let config = JwtConfig::from_env().unwrap();
                assert_eq!(config.secret, SECRET);
                assert_eq!(config.ttl_secs, 3600);
            },
        );
        temp_env::with_vars([("JWT_SECRET", Some(SECRET)), ("JWT_TTL_SECS", None)], || {
            assert_eq!(JwtConfig::from_env().unwrap().ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        });
    }

    #[test]
    fn test_from_env_errors_name_the_variable() {
        let cases: [(Option<&str>, Option<&str>, &str); 4] = [
            (None, None, "JWT_SECRET"),
            (Some("short"), None, "JWT_SECRET"),
            (Some(SECRET), Some("-1"), "JWT_TTL_SECS"),
            (Some(SECRET), Some("a week"), "JWT_TTL_SECS"),
        ];
        for (secret, ttl, key) in cases {
            temp_env::with_vars([("JWT_SECRET", secret), ("JWT_TTL_SECS", ttl)], || {
                let err = JwtConfig::from_env().unwrap_err();
                assert!(err.to_string().contains(key), "{err}");
            });
        }
    }
}
