use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::memory::MemoryStore;
use crate::named::NamedRepo;
use crate::user_roles::RoleKind;
use crate::user_statuses::StatusKind;
use crate::users::UserRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub roles: Arc<dyn NamedRepo<RoleKind>>,
    pub statuses: Arc<dyn NamedRepo<StatusKind>>,
    pub users: Arc<dyn UserRepo>,
}

impl AppState {
    /// Connects, migrates and wires the Postgres store.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = crate::db::connect(&config).await?;
        crate::db::migrate(&pool).await?;
        Ok(Self::from_store(Arc::new(config), Arc::new(PgStore::new(pool))))
    }

    /// One store serves every repository.
    pub fn from_store<S>(config: Arc<AppConfig>, store: Arc<S>) -> Self
    where
        S: NamedRepo<RoleKind> + NamedRepo<StatusKind> + UserRepo + 'static,
    {
        Self {
            config,
            roles: store.clone(),
            statuses: store.clone(),
            users: store,
        }
    }

    /// In-memory state with the seeded catalogues, for tests.
    pub fn fake() -> Self {
        Self::from_store(Arc::new(AppConfig::fake()), Arc::new(MemoryStore::seeded()))
    }
}
