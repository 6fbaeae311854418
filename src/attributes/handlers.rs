use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AttributeListQuery, AttributeRequest},
    repo_types::{Attribute, AttributeKind},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppJson, AppPath},
    state::AppState,
};

pub fn attribute_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/tags/", get(list_tags))
        .route(
            "/recipe/tags/:id/",
            get(get_tag).put(replace_tag).patch(patch_tag).delete(delete_tag),
        )
        .route("/recipe/ingredients/", get(list_ingredients))
        .route(
            "/recipe/ingredients/:id/",
            get(get_ingredient)
                .put(replace_ingredient)
                .patch(patch_ingredient)
                .delete(delete_ingredient),
        )
}

fn not_found(kind: AttributeKind) -> AppError {
    AppError::NotFound(format!("No {} matches the given query.", kind.label()))
}

async fn list(
    state: &AppState,
    kind: AttributeKind,
    user: &AuthUser,
    query: &AttributeListQuery,
) -> Result<Json<Vec<Attribute>>, AppError> {
    let items = state
        .attributes
        .list(kind, user.0.id, query.assigned_only())
        .await?;
    Ok(Json(items))
}

async fn fetch(state: &AppState, kind: AttributeKind, user: &AuthUser, id: i64) -> Result<Json<Attribute>, AppError> {
    let item = state
        .attributes
        .get(kind, user.0.id, id)
        .await?
        .ok_or_else(|| not_found(kind))?;
    Ok(Json(item))
}

async fn update(
    state: &AppState,
    kind: AttributeKind,
    user: &AuthUser,
    id: i64,
    payload: AttributeRequest,
    partial: bool,
) -> Result<Json<Attribute>, AppError> {
    let owner = user.0.id;
    let current = state
        .attributes
        .get(kind, owner, id)
        .await?
        .ok_or_else(|| not_found(kind))?;
    payload.check(partial).into_result()?;

    let Some(name) = payload.name.map(|n| n.trim().to_string()) else {
        return Ok(Json(current));
    };
    let renamed = state
        .attributes
        .rename(kind, owner, id, &name)
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::field(
                "name",
                format!("{} with this name already exists.", kind.label()),
            ),
            other => other,
        })?
        .ok_or_else(|| not_found(kind))?;
    info!(kind = kind.label(), id, "attribute renamed");
    Ok(Json(renamed))
}

async fn remove(state: &AppState, kind: AttributeKind, user: &AuthUser, id: i64) -> Result<StatusCode, AppError> {
    if !state.attributes.delete(kind, user.0.id, id).await? {
        return Err(not_found(kind));
    }
    info!(kind = kind.label(), id, "attribute deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn list_tags(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AttributeListQuery>,
) -> Result<Json<Vec<Attribute>>, AppError> {
    list(&state, AttributeKind::Tag, &user, &query).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn get_tag(State(state): State<AppState>, user: AuthUser, AppPath(id): AppPath<i64>) -> Result<Json<Attribute>, AppError> {
    fetch(&state, AttributeKind::Tag, &user, id).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn replace_tag(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<AttributeRequest>,
) -> Result<Json<Attribute>, AppError> {
    update(&state, AttributeKind::Tag, &user, id, payload, false).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn patch_tag(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<AttributeRequest>,
) -> Result<Json<Attribute>, AppError> {
    update(&state, AttributeKind::Tag, &user, id, payload, true).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn delete_tag(State(state): State<AppState>, user: AuthUser, AppPath(id): AppPath<i64>) -> Result<StatusCode, AppError> {
    remove(&state, AttributeKind::Tag, &user, id).await
}

#[instrument(skip_all, fields(user_id = %user.0.id))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AttributeListQuery>,
) -> Result<Json<Vec<Attribute>>, AppError> {
    list(&state, AttributeKind::Ingredient, &user, &query).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Attribute>, AppError> {
    fetch(&state, AttributeKind::Ingredient, &user, id).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn replace_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<AttributeRequest>,
) -> Result<Json<Attribute>, AppError> {
    update(&state, AttributeKind::Ingredient, &user, id, payload, false).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn patch_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<AttributeRequest>,
) -> Result<Json<Attribute>, AppError> {
    update(&state, AttributeKind::Ingredient, &user, id, payload, true).await
}

#[instrument(skip_all, fields(user_id = %user.0.id, id = id))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    remove(&state, AttributeKind::Ingredient, &user, id).await
}
