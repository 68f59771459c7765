use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use time::OffsetDateTime;

use crate::{error::ApiError, named::repo::NamedRepo, state::AppState, users::User};

/// A catalogue table of `name`/`description` rows referenced by users
/// (roles, statuses).
pub trait NamedKind: Debug + Clone + Copy + PartialEq + Eq + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    /// Singular label used in client-facing messages.
    const LABEL: &'static str;

    fn repo(state: &AppState) -> Arc<dyn NamedRepo<Self>>;

    /// The user column that points at this table.
    fn referenced_by(user: &User) -> i64;

    fn not_found() -> String {
        format!("{} not found", Self::LABEL)
    }

    fn duplicate() -> String {
        format!("{} already exists", Self::LABEL)
    }

    fn in_use() -> String {
        format!("{} is still assigned to users", Self::LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Named<K> {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K> Named<K> {
    pub fn new(
        id: i64,
        name: String,
        description: String,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
            updated_at,
            kind: PhantomData,
        }
    }

    /// Reads the row from columns named `{prefix}id`, `{prefix}name`, ...
    pub(crate) fn from_prefixed(row: &PgRow, prefix: &str) -> Result<Self, sqlx::Error> {
        let col = |name: &str| format!("{prefix}{name}");
        Ok(Self::new(
            row.try_get(col("id").as_str())?,
            row.try_get(col("name").as_str())?,
            row.try_get(col("description").as_str())?,
            row.try_get(col("created_at").as_str())?,
            row.try_get(col("updated_at").as_str())?,
        ))
    }
}

impl<'r, K> FromRow<'r, PgRow> for Named<K> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Self::from_prefixed(row, "")
    }
}

/// Exactly one way of addressing a catalogue row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(i64),
    Name(String),
}

impl LookupKey {
    /// `Ok(None)` when neither part is given.
    pub fn from_parts(id: Option<i64>, name: Option<String>) -> Result<Option<Self>, ApiError> {
        match (id, name) {
            (Some(_), Some(_)) => Err(ApiError::validation("Provide either id or name, not both")),
            (Some(id), None) => Ok(Some(LookupKey::Id(id))),
            (None, Some(name)) => Ok(Some(LookupKey::Name(name))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNamed {
    pub name: String,
    pub description: String,
}

/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl NamedPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}
