use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

/// Failures surfaced by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    NotFound(String),
    /// Unique column already taken.
    #[error("{0}")]
    Conflict(String),
    /// Row is still referenced under a `restrict` rule.
    #[error("{0}")]
    Restricted(String),
    /// Value rejected by a check constraint.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("run migrations")
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Messages used when a write trips a constraint.
pub(crate) struct WriteContext {
    pub unique: String,
    pub foreign_key: String,
    pub check: String,
}

/// Translates constraint violations into their `DbError` kind.
pub(crate) fn classify(err: sqlx::Error, ctx: &WriteContext) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DbError::Conflict(ctx.unique.clone());
        }
        if db.is_foreign_key_violation() {
            return DbError::Restricted(ctx.foreign_key.clone());
        }
        if db.is_check_violation() {
            return DbError::Invalid(ctx.check.clone());
        }
    }
    DbError::Sqlx(err)
}

/// Builds a case-insensitive substring pattern with LIKE wildcards escaped.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("adm"), "%adm%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn non_database_errors_pass_through() {
        let ctx = WriteContext {
            unique: "dup".into(),
            foreign_key: "fk".into(),
            check: "check".into(),
        };
        let err = classify(sqlx::Error::RowNotFound, &ctx);
        assert!(matches!(err, DbError::Sqlx(sqlx::Error::RowNotFound)));
    }
}
