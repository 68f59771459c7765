//! The `access_token` session cookie.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

use crate::auth::jwt::SESSION_TTL;

pub const SESSION_COOKIE: &str = "access_token";

/// HttpOnly, SameSite=Strict cookie on `/`; `secure` in production.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(SESSION_TTL.as_secs() as i64))
        .build()
}

/// Expired, empty cookie that overwrites the session in the browser.
pub fn logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// The cookie wins; otherwise `Authorization` as `<scheme> <token>` or a
/// bare token.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = raw
        .split_once(' ')
        .map(|(_, token)| token)
        .unwrap_or(raw)
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok".into(), false);
        assert_eq!(cookie.name(), "access_token");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(1)));
        assert_ne!(cookie.secure(), Some(true));

        assert_eq!(session_cookie("tok".into(), true).secure(), Some(true));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = logout_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn header_forms() {
        let jar = CookieJar::new();
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&jar, &headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("abc"));
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_token(&jar, &headers), None);
    }
}
