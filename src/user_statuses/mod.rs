use std::sync::Arc;

use axum::Router;

use crate::{
    named::{self, Named, NamedKind, NamedRepo},
    state::AppState,
    users::User,
};

/// Assigned to new users that do not name a status.
pub const DEFAULT_STATUS: &str = "pending";
pub const ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusKind;

impl NamedKind for StatusKind {
    const TABLE: &'static str = "user_statuses";
    const LABEL: &'static str = "Status";

    fn repo(state: &AppState) -> Arc<dyn NamedRepo<Self>> {
        state.statuses.clone()
    }

    fn referenced_by(user: &User) -> i64 {
        user.status_id
    }
}

pub type UserStatus = Named<StatusKind>;

pub fn router() -> Router<AppState> {
    named::routes::<StatusKind>("/user-statuses")
}
