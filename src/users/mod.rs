use axum::{routing::get, Router};

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub use repo::UserRepo;
pub use repo_types::{ExpandedUser, NewUser, User, UserKey, UserPatch, UserView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list).post(handlers::create))
        .route(
            "/users/:id",
            get(handlers::get_one)
                .put(handlers::update)
                .delete(handlers::delete),
        )
}
