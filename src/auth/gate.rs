//! Request gate: every route needs a valid session except a short list of
//! public endpoints.

use axum::{
    extract::{FromRef, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use crate::{
    auth::{cookie::session_token, jwt::JwtKeys},
    error::ApiError,
    state::AppState,
};

/// `(method, path)`; `*` matches any method.
const PUBLIC_ENDPOINTS: &[(&str, &str)] = &[
    ("POST", "/api/auth/login"),
    ("POST", "/api/auth/logout"),
    ("GET", "/api/auth/me"),
    ("GET", "/api/health"),
];

/// Lower-cases, drops any query string and trailing slashes.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/').to_lowercase();
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed
    }
}

pub fn is_public(method: &Method, path: &str) -> bool {
    let path = normalize_path(path);
    PUBLIC_ENDPOINTS
        .iter()
        .any(|(m, p)| (*m == "*" || method.as_str().eq_ignore_ascii_case(m)) && *p == path)
}

/// Rejects requests without a verifiable session before any handler runs.
/// Accepted claims are stored in the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let Some(token) = session_token(&jar, req.headers()) else {
        debug!(path = %req.uri().path(), "no session token");
        return ApiError::unauthorized().into_response();
    };

    match JwtKeys::from_ref(&state).verify(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            warn!(error = %e, path = %req.uri().path(), "session token rejected");
            ApiError::unauthorized().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("/API/Auth/Login/"), "/api/auth/login");
        assert_eq!(normalize_path("/api/health?x=1"), "/api/health");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn allow_list_matches_method_and_path() {
        assert!(is_public(&Method::POST, "/api/auth/login"));
        assert!(is_public(&Method::POST, "/api/auth/login/"));
        assert!(is_public(&Method::GET, "/api/health"));
        assert!(is_public(&Method::GET, "/api/auth/me"));
        assert!(!is_public(&Method::GET, "/api/auth/login"));
        assert!(!is_public(&Method::GET, "/api/users"));
        assert!(!is_public(&Method::POST, "/api/user-roles"));
    }
}
