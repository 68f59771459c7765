use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod cookie;
mod dto;
pub(crate) mod extractors;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
