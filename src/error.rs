use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::db::DbError;

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Restricted(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(vec![message.into()])
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Unauthorized".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Restricted(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing messages; internal causes never leave the process.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ApiError::Validation(errors) => errors.clone(),
            ApiError::Internal(_) => vec!["An error occurred".into()],
            other => vec![other.to_string()],
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(msg) => ApiError::NotFound(msg),
            DbError::Conflict(msg) => ApiError::Conflict(msg),
            DbError::Restricted(msg) => ApiError::Restricted(msg),
            DbError::Invalid(msg) => ApiError::Validation(vec![msg]),
            DbError::Sqlx(e) => ApiError::Internal(anyhow::Error::new(e).context("store failure")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(e) => error!(error = ?e, "request failed"),
            other => warn!(%status, error = %other, "request rejected"),
        }
        (status, Json(ErrorBody { errors: self.messages() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_genericized() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.7"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.messages(), vec!["An error occurred".to_string()]);
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (DbError::NotFound("Role not found".into()), StatusCode::NOT_FOUND),
            (DbError::Conflict("Role already exists".into()), StatusCode::BAD_REQUEST),
            (DbError::Restricted("Role is in use".into()), StatusCode::CONFLICT),
            (DbError::Invalid("bad email".into()), StatusCode::BAD_REQUEST),
            (DbError::Sqlx(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (db, status) in cases {
            assert_eq!(ApiError::from(db).status(), status);
        }
    }

    #[test]
    fn validation_keeps_every_message() {
        let err = ApiError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.messages(), vec!["a".to_string(), "b".to_string()]);
    }
}
