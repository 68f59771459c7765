pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod memory;
pub mod named;
pub mod seed;
pub mod state;
pub mod user_roles;
pub mod user_statuses;
pub mod users;
pub mod validation;

pub use app::{build_app, serve};
pub use state::AppState;
