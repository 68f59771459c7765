//! In-process store with the same observable behaviour as the Postgres one:
//! unique names and emails, restrict-on-delete, inner-join expansion.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    db::DbError,
    named::{LookupKey, Named, NamedKind, NamedPatch, NamedRepo, NewNamed},
    user_roles::RoleKind,
    user_statuses::StatusKind,
    users::{
        repo::{EMAIL_TAKEN, USER_NOT_FOUND},
        ExpandedUser, NewUser, User, UserKey, UserPatch, UserRepo, UserView,
    },
    validation::Page,
};

const MISSING_REFERENCE: &str = "Role or status does not exist";

#[derive(Debug, Clone)]
struct NamedRow {
    id: i64,
    name: String,
    description: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl NamedRow {
    fn typed<K>(&self) -> Named<K> {
        Named::new(
            self.id,
            self.name.clone(),
            self.description.clone(),
            self.created_at,
            self.updated_at,
        )
    }
}

#[derive(Debug, Default)]
struct NamedTable {
    rows: BTreeMap<i64, NamedRow>,
    last_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    named: HashMap<&'static str, NamedTable>,
    users: BTreeMap<i64, User>,
    last_user_id: i64,
}

impl Tables {
    fn table(&mut self, name: &'static str) -> &mut NamedTable {
        self.named.entry(name).or_default()
    }

    fn has_row(&self, table: &'static str, id: i64) -> bool {
        self.named
            .get(table)
            .is_some_and(|t| t.rows.contains_key(&id))
    }

    fn insert_named(&mut self, table: &'static str, name: &str, description: &str) -> NamedRow {
        let now = OffsetDateTime::now_utc();
        let t = self.table(table);
        t.last_id += 1;
        let row = NamedRow {
            id: t.last_id,
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.rows.insert(row.id, row.clone());
        row
    }

    /// `None` when expanding and the role or status row is gone.
    fn view(&self, user: &User, expand: bool) -> Option<UserView> {
        if !expand {
            return Some(UserView::Basic(user.clone()));
        }
        let role = self.named.get(RoleKind::TABLE)?.rows.get(&user.role_id)?;
        let status = self.named.get(StatusKind::TABLE)?.rows.get(&user.status_id)?;
        Some(UserView::Expanded(ExpandedUser::from_parts(
            user.clone(),
            role.typed(),
            status.typed(),
        )))
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn references_exist(&self, role_id: i64, status_id: i64) -> bool {
        self.has_row(RoleKind::TABLE, role_id) && self.has_row(StatusKind::TABLE, status_id)
    }
}

/// Backs `AppState::fake()`. A single async mutex serializes writers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Same catalogue rows the initial migration inserts.
    pub fn seeded() -> Self {
        let mut tables = Tables::default();
        for (name, description) in [("admin", "Administrator"), ("user", "User")] {
            tables.insert_named(RoleKind::TABLE, name, description);
        }
        for (name, description) in [
            ("pending", "Pending"),
            ("active", "Active"),
            ("inactive", "Inactive"),
            ("suspended", "Suspended"),
        ] {
            tables.insert_named(StatusKind::TABLE, name, description);
        }
        Self {
            tables: Mutex::new(tables),
        }
    }
}

fn matches_filter(name: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |n| name.to_lowercase().contains(n))
}

#[async_trait]
impl<K: NamedKind> NamedRepo<K> for MemoryStore {
    async fn list(&self, filter: Option<String>, page: Page) -> Result<Vec<Named<K>>, DbError> {
        let mut tables = self.tables.lock().await;
        let needle = filter.map(|f| f.to_lowercase());
        Ok(tables
            .table(K::TABLE)
            .rows
            .values()
            .filter(|r| matches_filter(&r.name, needle.as_deref()))
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(NamedRow::typed::<K>)
            .collect())
    }

    async fn find(&self, key: &LookupKey) -> Result<Option<Named<K>>, DbError> {
        let mut tables = self.tables.lock().await;
        let rows = &tables.table(K::TABLE).rows;
        let row = match key {
            LookupKey::Id(id) => rows.get(id),
            LookupKey::Name(name) => rows.values().find(|r| &r.name == name),
        };
        Ok(row.map(NamedRow::typed::<K>))
    }

    async fn create(&self, new: NewNamed) -> Result<Named<K>, DbError> {
        let mut tables = self.tables.lock().await;
        if tables
            .table(K::TABLE)
            .rows
            .values()
            .any(|r| r.name == new.name)
        {
            return Err(DbError::Conflict(K::duplicate()));
        }
        Ok(tables
            .insert_named(K::TABLE, &new.name, &new.description)
            .typed())
    }

    async fn update(&self, id: i64, patch: NamedPatch) -> Result<Named<K>, DbError> {
        let mut tables = self.tables.lock().await;
        let table = tables.table(K::TABLE);
        if !table.rows.contains_key(&id) {
            return Err(DbError::NotFound(K::not_found()));
        }
        if let Some(name) = &patch.name {
            if table.rows.values().any(|r| &r.name == name && r.id != id) {
                return Err(DbError::Conflict(K::duplicate()));
            }
        }
        let row = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| DbError::NotFound(K::not_found()))?;
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.typed())
    }

    async fn delete(&self, id: i64) -> Result<Named<K>, DbError> {
        let mut tables = self.tables.lock().await;
        if !tables.has_row(K::TABLE, id) {
            return Err(DbError::NotFound(K::not_found()));
        }
        if tables.users.values().any(|u| K::referenced_by(u) == id) {
            return Err(DbError::Restricted(K::in_use()));
        }
        let row = tables
            .table(K::TABLE)
            .rows
            .remove(&id)
            .ok_or_else(|| DbError::NotFound(K::not_found()))?;
        Ok(row.typed())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn list(
        &self,
        filter: Option<String>,
        page: Page,
        expand: bool,
    ) -> Result<Vec<UserView>, DbError> {
        let tables = self.tables.lock().await;
        let needle = filter.map(|f| f.to_lowercase());
        Ok(tables
            .users
            .values()
            .filter(|u| matches_filter(&u.name, needle.as_deref()))
            .filter_map(|u| tables.view(u, expand))
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find(&self, key: &UserKey, expand: bool) -> Result<Option<UserView>, DbError> {
        let tables = self.tables.lock().await;
        let user = match key {
            UserKey::Id(id) => tables.users.get(id),
            UserKey::Email(email) => tables.users.values().find(|u| &u.email == email),
        };
        Ok(user.and_then(|u| tables.view(u, expand)))
    }

    async fn create(&self, new: NewUser, expand: bool) -> Result<UserView, DbError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&new.email, None) {
            return Err(DbError::Conflict(EMAIL_TAKEN.into()));
        }
        if !tables.references_exist(new.role_id, new.status_id) {
            return Err(DbError::Restricted(MISSING_REFERENCE.into()));
        }

        let now = OffsetDateTime::now_utc();
        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            verification_token: None,
            role_id: new.role_id,
            status_id: new.status_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        tables
            .view(&user, expand)
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))
    }

    async fn update(&self, id: i64, patch: UserPatch, expand: bool) -> Result<UserView, DbError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))?;
        if let Some(email) = &patch.email {
            if tables.email_taken(email, Some(id)) {
                return Err(DbError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        let role_id = patch.role_id.unwrap_or(current.role_id);
        let status_id = patch.status_id.unwrap_or(current.status_id);
        if (patch.role_id.is_some() || patch.status_id.is_some())
            && !tables.references_exist(role_id, status_id)
        {
            return Err(DbError::Restricted(MISSING_REFERENCE.into()));
        }

        let updated = User {
            name: patch.name.unwrap_or(current.name),
            email: patch.email.unwrap_or(current.email),
            password_hash: patch.password_hash.unwrap_or(current.password_hash),
            role_id,
            status_id,
            updated_at: OffsetDateTime::now_utc(),
            ..current
        };
        tables.users.insert(id, updated.clone());
        tables
            .view(&updated, expand)
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))
    }

    async fn delete(&self, id: i64, expand: bool) -> Result<UserView, DbError> {
        let mut tables = self.tables.lock().await;
        let snapshot = tables
            .users
            .get(&id)
            .and_then(|u| tables.view(u, expand))
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))?;
        tables.users.remove(&id);
        Ok(snapshot)
    }
}
