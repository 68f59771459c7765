use std::sync::Arc;

use axum::Router;

use crate::{
    named::{self, Named, NamedKind, NamedRepo},
    state::AppState,
    users::User,
};

pub const ADMIN: &str = "admin";
/// Assigned to new users that do not name a role.
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleKind;

impl NamedKind for RoleKind {
    const TABLE: &'static str = "user_roles";
    const LABEL: &'static str = "Role";

    fn repo(state: &AppState) -> Arc<dyn NamedRepo<Self>> {
        state.roles.clone()
    }

    fn referenced_by(user: &User) -> i64 {
        user.role_id
    }
}

pub type UserRole = Named<RoleKind>;

pub fn router() -> Router<AppState> {
    named::routes::<RoleKind>("/user-roles")
}
