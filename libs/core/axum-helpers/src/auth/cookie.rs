//! Session cookie helpers.

use axum::http::HeaderValue;

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn session_cookie(
    token: &str,
    max_age_secs: i64,
    secure: bool,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let secure_flag = if secure { " Secure;" } else { "" };
    HeaderValue::from_str(&format!(
        "{TOKEN_COOKIE}={token}; HttpOnly;{secure_flag} SameSite=Strict; Path=/; Max-Age={}",
        max_age_secs.max(0)
    ))
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("token=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0")
    } else {
        HeaderValue::from_static("token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
    }
}

/// Value of cookie `name` in a `Cookie` header.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
