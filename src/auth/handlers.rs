use axum::{
    extract::{FromRef, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Claims,
        cookie::{logout_cookie, session_cookie, session_token},
        dto::{LoginRequest, MessageResponse},
        jwt::JwtKeys,
        password::verify_password,
    },
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    state::AppState,
    users::{UserKey, UserView},
    validation::{is_valid_email, normalize_email, ExpandQuery},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiQuery(query): ApiQuery<ExpandQuery>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<UserView>)> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    let Some(user) = state
        .users
        .find(&UserKey::Email(email.clone()), query.expand())
        .await?
    else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, user.password_hash())? {
        warn!(email = %email, user_id = user.id(), "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(&user)?;
    let jar = jar.add(session_cookie(token, state.config.is_production()));

    info!(user_id = user.id(), email = %email, "user logged in");
    Ok((jar, Json(user)))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(logout_cookie(state.config.is_production()));
    info!("session cleared");
    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

/// Returns the verified claims. A token that fails verification also gets
/// its cookie cleared.
#[instrument(skip(state, jar, headers))]
pub async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<Claims>, (CookieJar, ApiError)> {
    let Some(token) = session_token(&jar, &headers) else {
        return Err((jar, ApiError::unauthorized()));
    };

    match JwtKeys::from_ref(&state).verify(&token) {
        Ok(claims) => Ok(Json(claims)),
        Err(e) => {
            warn!(error = %e, "invalid session token");
            let jar = jar.add(logout_cookie(state.config.is_production()));
            Err((jar, ApiError::Unauthorized("Invalid token".into())))
        }
    }
}
