use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use time::OffsetDateTime;

use crate::{user_roles::UserRole, user_statuses::UserStatus};

/// User record in the database. Private columns never serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    #[serde(skip)]
    pub verification_token: Option<String>,
    pub role_id: i64,
    pub status_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// User with its role and status rows embedded in place of the ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub verification_token: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ExpandedUser {
    pub fn from_parts(user: User, role: UserRole, status: UserStatus) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            verification_token: user.verification_token,
            role,
            status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Reads a `users` row joined with `role_*` and `status_*` columns.
impl<'r> FromRow<'r, PgRow> for ExpandedUser {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let user = User::from_row(row)?;
        let role = UserRole::from_prefixed(row, "role_")?;
        let status = UserStatus::from_prefixed(row, "status_")?;
        Ok(Self::from_parts(user, role, status))
    }
}

/// A user as returned by the API: foreign keys as ids, or expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserView {
    Expanded(ExpandedUser),
    Basic(User),
}

impl UserView {
    pub fn id(&self) -> i64 {
        match self {
            UserView::Expanded(u) => u.id,
            UserView::Basic(u) => u.id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            UserView::Expanded(u) => &u.email,
            UserView::Basic(u) => &u.email,
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            UserView::Expanded(u) => &u.password_hash,
            UserView::Basic(u) => &u.password_hash,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, UserView::Expanded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(i64),
    Email(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: i64,
    pub status_id: i64,
}

/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<i64>,
    pub status_id: Option<i64>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role_id.is_none()
            && self.status_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> User {
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            verification_token: Some("0123456789abcdef".into()),
            role_id: 2,
            status_id: 1,
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-02 0:00 UTC),
        }
    }

    #[test]
    fn private_fields_never_serialize() {
        let json = serde_json::to_value(UserView::Basic(user())).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["roleId"], 2);
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password").is_none());
        assert!(json.get("verificationToken").is_none());
    }

    #[test]
    fn expanded_view_embeds_role_and_status() {
        let ts = datetime!(2024-01-01 0:00 UTC);
        let view = UserView::Expanded(ExpandedUser::from_parts(
            user(),
            UserRole::new(2, "user".into(), "User".into(), ts, ts),
            UserStatus::new(1, "pending".into(), "Pending".into(), ts, ts),
        ));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["role"]["name"], "user");
        assert_eq!(json["status"]["name"], "pending");
        assert!(json.get("roleId").is_none());
        assert!(json.get("statusId").is_none());

        let back: UserView = serde_json::from_value(json).unwrap();
        assert!(back.is_expanded());
        assert_eq!(back.id(), 1);
        assert_eq!(back.password_hash(), "");
    }

    #[test]
    fn basic_view_deserializes_as_basic() {
        let json = serde_json::to_value(UserView::Basic(user())).unwrap();
        let back: UserView = serde_json::from_value(json).unwrap();
        assert!(!back.is_expanded());
        assert_eq!(back.email(), "ada@example.com");
    }

    #[test]
    fn empty_patch() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            role_id: Some(1),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
