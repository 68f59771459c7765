use async_trait::async_trait;

use crate::{
    db::{classify, contains_pattern, DbError, PgStore, WriteContext},
    named::repo_types::{LookupKey, Named, NamedKind, NamedPatch, NewNamed},
    validation::Page,
};

#[async_trait]
pub trait NamedRepo<K: NamedKind>: Send + Sync {
    /// Rows in id order, optionally narrowed to names containing `filter`.
    async fn list(&self, filter: Option<String>, page: Page) -> Result<Vec<Named<K>>, DbError>;

    async fn find(&self, key: &LookupKey) -> Result<Option<Named<K>>, DbError>;

    async fn create(&self, new: NewNamed) -> Result<Named<K>, DbError>;

    async fn update(&self, id: i64, patch: NamedPatch) -> Result<Named<K>, DbError>;

    /// Returns the row as it was before removal.
    async fn delete(&self, id: i64) -> Result<Named<K>, DbError>;
}

const COLUMNS: &str = "id, name, description, created_at, updated_at";

fn write_context<K: NamedKind>() -> WriteContext {
    WriteContext {
        unique: K::duplicate(),
        foreign_key: K::in_use(),
        check: format!("{} violates a table constraint", K::LABEL),
    }
}

#[async_trait]
impl<K: NamedKind> NamedRepo<K> for PgStore {
    async fn list(&self, filter: Option<String>, page: Page) -> Result<Vec<Named<K>>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY id LIMIT $2 OFFSET $3",
            K::TABLE
        );
        let rows = sqlx::query_as::<_, Named<K>>(&sql)
            .bind(filter.as_deref().map(contains_pattern))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find(&self, key: &LookupKey) -> Result<Option<Named<K>>, DbError> {
        let row = match key {
            LookupKey::Id(id) => {
                let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", K::TABLE);
                sqlx::query_as::<_, Named<K>>(&sql)
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            LookupKey::Name(name) => {
                let sql = format!("SELECT {COLUMNS} FROM {} WHERE name = $1", K::TABLE);
                sqlx::query_as::<_, Named<K>>(&sql)
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row)
    }

    async fn create(&self, new: NewNamed) -> Result<Named<K>, DbError> {
        let ctx = write_context::<K>();

        let mut tx = self.pool.begin().await?;

        let taken: Option<i64> =
            sqlx::query_scalar(&format!("SELECT id FROM {} WHERE name = $1", K::TABLE))
                .bind(&new.name)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(DbError::Conflict(ctx.unique));
        }

        // The unique index still decides concurrent inserts.
        let sql = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) RETURNING {COLUMNS}",
            K::TABLE
        );
        let row = sqlx::query_as::<_, Named<K>>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify(e, &ctx))?;

        tx.commit().await?;
        tracing::debug!(table = K::TABLE, id = row.id, "row created");
        Ok(row)
    }

    async fn update(&self, id: i64, patch: NamedPatch) -> Result<Named<K>, DbError> {
        let ctx = write_context::<K>();
        let sql = format!(
            "UPDATE {} SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}",
            K::TABLE
        );
        sqlx::query_as::<_, Named<K>>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.description)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, &ctx))?
            .ok_or_else(|| DbError::NotFound(K::not_found()))
    }

    async fn delete(&self, id: i64) -> Result<Named<K>, DbError> {
        let ctx = write_context::<K>();
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING {COLUMNS}", K::TABLE);
        sqlx::query_as::<_, Named<K>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, &ctx))?
            .ok_or_else(|| DbError::NotFound(K::not_found()))
    }
}
