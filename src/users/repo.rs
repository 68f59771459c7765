use async_trait::async_trait;
use sqlx::PgConnection;

use crate::{
    db::{classify, contains_pattern, DbError, PgStore, WriteContext},
    users::repo_types::{ExpandedUser, NewUser, User, UserKey, UserPatch, UserView},
    validation::Page,
};

pub const USER_NOT_FOUND: &str = "User not found";
pub const EMAIL_TAKEN: &str = "Email already in use";
pub const USER_REFERENCED: &str = "User is still referenced";

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Users in id order. With `expand`, users whose role or status row is
    /// missing are left out.
    async fn list(
        &self,
        filter: Option<String>,
        page: Page,
        expand: bool,
    ) -> Result<Vec<UserView>, DbError>;

    async fn find(&self, key: &UserKey, expand: bool) -> Result<Option<UserView>, DbError>;

    async fn create(&self, new: NewUser, expand: bool) -> Result<UserView, DbError>;

    async fn update(&self, id: i64, patch: UserPatch, expand: bool) -> Result<UserView, DbError>;

    /// Returns the user as it was before removal.
    async fn delete(&self, id: i64, expand: bool) -> Result<UserView, DbError>;
}

const BASIC_SELECT: &str = "SELECT u.id, u.name, u.email, u.password, u.verification_token, \
     u.role_id, u.status_id, u.created_at, u.updated_at \
     FROM users u";

const EXPANDED_SELECT: &str = "SELECT u.id, u.name, u.email, u.password, u.verification_token, \
     u.role_id, u.status_id, u.created_at, u.updated_at, \
     r.name AS role_name, r.description AS role_description, \
     r.created_at AS role_created_at, r.updated_at AS role_updated_at, \
     s.name AS status_name, s.description AS status_description, \
     s.created_at AS status_created_at, s.updated_at AS status_updated_at \
     FROM users u \
     INNER JOIN user_roles r ON r.id = u.role_id \
     INNER JOIN user_statuses s ON s.id = u.status_id";

fn write_context() -> WriteContext {
    WriteContext {
        unique: EMAIL_TAKEN.into(),
        foreign_key: "Role or status does not exist".into(),
        check: "Invalid email".into(),
    }
}

/// Rows in other tables may still point at the user being removed.
fn delete_context() -> WriteContext {
    WriteContext {
        foreign_key: USER_REFERENCED.into(),
        ..write_context()
    }
}

async fn select_user(
    conn: &mut PgConnection,
    key: &UserKey,
    expand: bool,
) -> Result<Option<UserView>, sqlx::Error> {
    let clause = match key {
        UserKey::Id(_) => "u.id = $1",
        UserKey::Email(_) => "u.email = $1",
    };
    if expand {
        let sql = format!("{EXPANDED_SELECT} WHERE {clause}");
        let query = sqlx::query_as::<_, ExpandedUser>(&sql);
        let query = match key {
            UserKey::Id(id) => query.bind(*id),
            UserKey::Email(email) => query.bind(email.clone()),
        };
        Ok(query.fetch_optional(conn).await?.map(UserView::Expanded))
    } else {
        let sql = format!("{BASIC_SELECT} WHERE {clause}");
        let query = sqlx::query_as::<_, User>(&sql);
        let query = match key {
            UserKey::Id(id) => query.bind(*id),
            UserKey::Email(email) => query.bind(email.clone()),
        };
        Ok(query.fetch_optional(conn).await?.map(UserView::Basic))
    }
}

/// Row lock for the rest of the transaction; `false` when the row is gone.
async fn lock_user(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

async fn email_taken(
    conn: &mut PgConnection,
    email: &str,
    except: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM users WHERE email = $1 AND ($2::bigint IS NULL OR id <> $2)",
    )
    .bind(email)
    .bind(except)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

#[async_trait]
impl UserRepo for PgStore {
    async fn list(
        &self,
        filter: Option<String>,
        page: Page,
        expand: bool,
    ) -> Result<Vec<UserView>, DbError> {
        let base = if expand { EXPANDED_SELECT } else { BASIC_SELECT };
        let sql = format!(
            "{base} WHERE ($1::text IS NULL OR u.name ILIKE $1) \
             ORDER BY u.id LIMIT $2 OFFSET $3"
        );
        let pattern = filter.as_deref().map(contains_pattern);
        let users = if expand {
            sqlx::query_as::<_, ExpandedUser>(&sql)
                .bind(pattern)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(UserView::Expanded)
                .collect()
        } else {
            sqlx::query_as::<_, User>(&sql)
                .bind(pattern)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(UserView::Basic)
                .collect()
        };
        Ok(users)
    }

    async fn find(&self, key: &UserKey, expand: bool) -> Result<Option<UserView>, DbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(select_user(&mut conn, key, expand).await?)
    }

    async fn create(&self, new: NewUser, expand: bool) -> Result<UserView, DbError> {
        let ctx = write_context();
        let mut tx = self.pool.begin().await?;

        if email_taken(&mut tx, &new.email, None).await? {
            return Err(DbError::Conflict(ctx.unique));
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, password, role_id, status_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role_id)
        .bind(new.status_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, &ctx))?;

        let user = select_user(&mut tx, &UserKey::Id(id), expand)
            .await?
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))?;
        tx.commit().await?;
        tracing::debug!(user_id = id, "user row created");
        Ok(user)
    }

    async fn update(&self, id: i64, patch: UserPatch, expand: bool) -> Result<UserView, DbError> {
        let ctx = write_context();
        let mut tx = self.pool.begin().await?;

        if !lock_user(&mut tx, id).await? {
            return Err(DbError::NotFound(USER_NOT_FOUND.into()));
        }
        if let Some(email) = &patch.email {
            if email_taken(&mut tx, email, Some(id)).await? {
                return Err(DbError::Conflict(ctx.unique));
            }
        }

        sqlx::query(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 email = COALESCE($3, email), \
                 password = COALESCE($4, password), \
                 role_id = COALESCE($5, role_id), \
                 status_id = COALESCE($6, status_id), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.role_id)
        .bind(patch.status_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, &ctx))?;

        let user = select_user(&mut tx, &UserKey::Id(id), expand)
            .await?
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))?;
        tx.commit().await?;
        Ok(user)
    }

    async fn delete(&self, id: i64, expand: bool) -> Result<UserView, DbError> {
        let ctx = delete_context();
        let mut tx = self.pool.begin().await?;

        if !lock_user(&mut tx, id).await? {
            return Err(DbError::NotFound(USER_NOT_FOUND.into()));
        }
        let snapshot = select_user(&mut tx, &UserKey::Id(id), expand)
            .await?
            .ok_or_else(|| DbError::NotFound(USER_NOT_FOUND.into()))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, &ctx))?;

        tx.commit().await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct ForeignKeyViolation;

    impl fmt::Display for ForeignKeyViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("violates foreign key constraint")
        }
    }

    impl std::error::Error for ForeignKeyViolation {}

    impl DatabaseError for ForeignKeyViolation {
        fn message(&self) -> &str {
            "violates foreign key constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::ForeignKeyViolation
        }
    }

    fn fk_violation() -> sqlx::Error {
        sqlx::Error::Database(Box::new(ForeignKeyViolation))
    }

    #[test]
    fn referenced_user_delete_reports_the_user() {
        match classify(fk_violation(), &delete_context()) {
            DbError::Restricted(msg) => assert_eq!(msg, USER_REFERENCED),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn writes_with_a_dangling_reference_report_role_or_status() {
        match classify(fk_violation(), &write_context()) {
            DbError::Restricted(msg) => assert_eq!(msg, "Role or status does not exist"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
