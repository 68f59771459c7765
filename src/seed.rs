use anyhow::Context;
use tracing::{debug, info};

use crate::{
    auth::password::hash_password,
    db::DbError,
    named::LookupKey,
    state::AppState,
    user_roles::ADMIN,
    user_statuses::ACTIVE,
    users::{NewUser, UserKey},
};

/// Creates the configured administrator once. Safe to run on every start.
pub async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let Some(admin) = state.config.admin.clone() else {
        debug!("no admin credentials configured; skipping seed");
        return Ok(());
    };

    if state
        .users
        .find(&UserKey::Email(admin.email.clone()), false)
        .await?
        .is_some()
    {
        debug!(email = %admin.email, "admin account present");
        return Ok(());
    }

    let role = state
        .roles
        .find(&LookupKey::Name(ADMIN.into()))
        .await?
        .context("admin role missing")?;
    let status = state
        .statuses
        .find(&LookupKey::Name(ACTIVE.into()))
        .await?
        .context("active status missing")?;

    let new = NewUser {
        name: "Admin".into(),
        email: admin.email.clone(),
        password_hash: hash_password(&admin.password)?,
        role_id: role.id,
        status_id: status.id,
    };
    match state.users.create(new, false).await {
        Ok(user) => info!(user_id = user.id(), email = %admin.email, "admin account created"),
        Err(DbError::Conflict(_)) => debug!(email = %admin.email, "admin created concurrently"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        auth::password::verify_password,
        config::{AdminSeed, AppConfig},
        memory::MemoryStore,
        users::UserView,
    };

    fn state_with_admin() -> AppState {
        let mut config = AppConfig::fake();
        config.admin = Some(AdminSeed {
            email: "root@example.com".into(),
            password: "bootstrap-pass".into(),
        });
        AppState::from_store(Arc::new(config), Arc::new(MemoryStore::seeded()))
    }

    #[tokio::test]
    async fn seeds_admin_once() {
        let state = state_with_admin();
        ensure_admin(&state).await.unwrap();
        ensure_admin(&state).await.unwrap();

        let user = state
            .users
            .find(&UserKey::Email("root@example.com".into()), true)
            .await
            .unwrap()
            .expect("admin exists");
        let UserView::Expanded(expanded) = &user else {
            panic!("expected expanded view");
        };
        assert_eq!(expanded.role.name, "admin");
        assert_eq!(expanded.status.name, "active");
        assert!(verify_password("bootstrap-pass", user.password_hash()).unwrap());
    }

    #[tokio::test]
    async fn skips_without_credentials() {
        let state = AppState::fake();
        ensure_admin(&state).await.unwrap();
        let users = state
            .users
            .list(None, Default::default(), false)
            .await
            .unwrap();
        assert!(users.is_empty());
    }
}
