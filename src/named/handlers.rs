use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    named::{
        dto::{CreateNamedRequest, UpdateNamedRequest},
        repo_types::{LookupKey, Named, NamedKind},
    },
    state::AppState,
    validation::{positive_id, ListQuery},
};

/// CRUD routes for one catalogue table mounted under `base`.
pub fn routes<K: NamedKind>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list::<K>).post(create::<K>))
        .route(&format!("{base}/name/:name"), get(get_by_name::<K>))
        .route(
            &format!("{base}/:id"),
            get(get_one::<K>).put(update::<K>).delete(delete::<K>),
        )
}

#[instrument(skip(state), fields(table = K::TABLE))]
pub async fn list<K: NamedKind>(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Named<K>>>> {
    let page = query.page()?;
    let rows = K::repo(&state).list(query.name_filter(), page).await?;
    Ok(Json(rows))
}

#[instrument(skip(state), fields(table = K::TABLE))]
pub async fn get_one<K: NamedKind>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Named<K>>> {
    let id = positive_id(id)?;
    K::repo(&state)
        .find(&LookupKey::Id(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(K::not_found()))
}

#[instrument(skip(state), fields(table = K::TABLE))]
pub async fn get_by_name<K: NamedKind>(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> ApiResult<Json<Named<K>>> {
    K::repo(&state)
        .find(&LookupKey::Name(name))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(K::not_found()))
}

#[instrument(skip(state, body), fields(table = K::TABLE))]
pub async fn create<K: NamedKind>(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateNamedRequest>,
) -> ApiResult<(StatusCode, Json<Named<K>>)> {
    let new = body.validate()?;
    let row = K::repo(&state).create(new).await?;
    info!(table = K::TABLE, id = row.id, name = %row.name, "created");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state, body), fields(table = K::TABLE))]
pub async fn update<K: NamedKind>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateNamedRequest>,
) -> ApiResult<Json<Named<K>>> {
    let id = positive_id(id)?;
    let patch = body.validate()?;
    let row = K::repo(&state).update(id, patch).await?;
    info!(table = K::TABLE, id, "updated");
    Ok(Json(row))
}

#[instrument(skip(state), fields(table = K::TABLE))]
pub async fn delete<K: NamedKind>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Named<K>>> {
    let id = positive_id(id)?;
    let row = K::repo(&state).delete(id).await?;
    info!(table = K::TABLE, id, "deleted");
    Ok(Json(row))
}
