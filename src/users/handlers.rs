use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::{
    auth::{extractors::CurrentUser, password::hash_password},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    named::{LookupKey, NamedKind},
    state::AppState,
    user_roles::RoleKind,
    user_statuses::StatusKind,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        repo::USER_NOT_FOUND,
        repo_types::{NewUser, UserKey, UserPatch, UserView},
    },
    validation::{positive_id, ExpandQuery, ListQuery},
};

/// Turns a role/status reference into its id. Unknown references are a
/// client error, not a missing resource.
async fn resolve<K: NamedKind>(state: &AppState, key: &LookupKey) -> ApiResult<i64> {
    match K::repo(state).find(key).await? {
        Some(row) => Ok(row.id),
        None => {
            warn!(table = K::TABLE, ?key, "unresolved reference");
            Err(ApiError::validation(K::not_found()))
        }
    }
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<UserView>>> {
    let page = query.page()?;
    let users = state
        .users
        .list(query.name_filter(), page, query.expand())
        .await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ExpandQuery>,
) -> ApiResult<Json<UserView>> {
    let id = positive_id(id)?;
    state
        .users
        .find(&UserKey::Id(id), query.expand())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(USER_NOT_FOUND.into()))
}

#[instrument(skip(state, actor, body))]
pub async fn create(
    State(state): State<AppState>,
    actor: CurrentUser,
    ApiQuery(query): ApiQuery<ExpandQuery>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let valid = body.validate()?;
    let role_id = resolve::<RoleKind>(&state, &valid.role).await?;
    let status_id = resolve::<StatusKind>(&state, &valid.status).await?;
    let password_hash = hash_password(&valid.password)?;

    let user = state
        .users
        .create(
            NewUser {
                name: valid.name,
                email: valid.email,
                password_hash,
                role_id,
                status_id,
            },
            query.expand(),
        )
        .await?;

    info!(user_id = user.id(), created_by = actor.id(), "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, actor, body))]
pub async fn update(
    State(state): State<AppState>,
    actor: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ExpandQuery>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserView>> {
    let id = positive_id(id)?;
    let valid = body.validate()?;

    let role_id = match &valid.role {
        Some(key) => Some(resolve::<RoleKind>(&state, key).await?),
        None => None,
    };
    let status_id = match &valid.status {
        Some(key) => Some(resolve::<StatusKind>(&state, key).await?),
        None => None,
    };
    let password_hash = valid.password.as_deref().map(hash_password).transpose()?;

    let patch = UserPatch {
        name: valid.name,
        email: valid.email,
        password_hash,
        role_id,
        status_id,
    };
    let user = state.users.update(id, patch, query.expand()).await?;

    info!(user_id = id, updated_by = actor.id(), "user updated");
    Ok(Json(user))
}

#[instrument(skip(state, actor))]
pub async fn delete(
    State(state): State<AppState>,
    actor: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ExpandQuery>,
) -> ApiResult<Json<UserView>> {
    let id = positive_id(id)?;
    let user = state.users.delete(id, query.expand()).await?;
    info!(user_id = id, deleted_by = actor.id(), "user deleted");
    Ok(Json(user))
}
