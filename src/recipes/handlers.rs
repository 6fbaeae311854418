use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};

use super::{
    dto::{RecipeDetail, RecipeImageResponse, RecipeListQuery, RecipePatch, RecipeRequest, RecipeSummary},
    repo_types::{Recipe, RecipeFilter},
    services::{validate_new, validate_patch, validate_replace},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppJson, AppPath, FieldErrors},
    images::services::{discard, presign, store_recipe_image, ImageFormat},
    state::AppState,
    validation::parse_id_list,
};

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/recipes/:id/",
            get(get_recipe)
                .put(replace_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
        .route(
            "/recipe/recipes/:id/upload-image/",
            post(upload_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("No Recipe matches the given query.".into())
}

async fn detail(state: &AppState, recipe: Recipe) -> Result<RecipeDetail, AppError> {
    let image = presign(state, recipe.row.image.as_deref()).await?;
    let description = recipe.row.description.clone();
    Ok(RecipeDetail {
        summary: recipe.into(),
        description,
        image,
    })
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeSummary>>, AppError> {
    let mut errors = FieldErrors::new();
    let filter = RecipeFilter {
        tags: parse_id_list(&mut errors, "tags", query.tags.as_deref()),
        ingredients: parse_id_list(&mut errors, "ingredients", query.ingredients.as_deref()),
    };
    errors.into_result()?;

    let recipes = state.recipes.list(user.id, &filter).await?;
    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<RecipeDetail>, AppError> {
    let recipe = state.recipes.get(user.id, id).await?.ok_or_else(not_found)?;
    Ok(Json(detail(&state, recipe).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<RecipeRequest>,
) -> Result<(StatusCode, HeaderMap, Json<RecipeDetail>), AppError> {
    let new = validate_new(payload)?;
    let recipe = state.recipes.create(user.id, new).await?;
    info!(recipe_id = recipe.row.id, "recipe created");

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/recipe/recipes/{}/", recipe.row.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(detail(&state, recipe).await?)))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<RecipeRequest>,
) -> Result<Json<RecipeDetail>, AppError> {
    // Ownership first: a foreign id is a 404 even when the payload is invalid.
    state.recipes.get(user.id, id).await?.ok_or_else(not_found)?;
    let changes = validate_replace(payload)?;
    let recipe = state
        .recipes
        .update(user.id, id, changes)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(detail(&state, recipe).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<RecipePatch>,
) -> Result<Json<RecipeDetail>, AppError> {
    state.recipes.get(user.id, id).await?.ok_or_else(not_found)?;
    let changes = validate_patch(payload)?;
    let recipe = state
        .recipes
        .update(user.id, id, changes)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(detail(&state, recipe).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let removed = state.recipes.delete(user.id, id).await?.ok_or_else(not_found)?;
    if let Some(key) = removed.image.as_deref() {
        discard(&state, key).await;
    }
    info!(recipe_id = id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipe/recipes/{id}/upload-image/ (multipart field `image`)
#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
    mut mp: Multipart,
) -> Result<Json<RecipeImageResponse>, AppError> {
    state.recipes.get(user.id, id).await?.ok_or_else(not_found)?;

    let mut image: Option<Bytes> = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() == Some("image") {
            image = Some(field.bytes().await?);
        }
    }

    let Some(body) = image.filter(|b| !b.is_empty()) else {
        return Err(AppError::field("image", "No file was submitted."));
    };
    let Some(format) = ImageFormat::sniff(&body) else {
        return Err(AppError::field(
            "image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        ));
    };

    let key = store_recipe_image(&state, user.id, id, format, body).await?;
    let Some((recipe, previous)) = state.recipes.set_image(user.id, id, &key).await? else {
        // Deleted while uploading.
        discard(&state, &key).await;
        return Err(not_found());
    };
    if let Some(old) = previous.as_deref() {
        discard(&state, old).await;
    }

    info!(recipe_id = id, key = %key, "recipe image uploaded");
    Ok(Json(RecipeImageResponse {
        id: recipe.row.id,
        image: presign(&state, recipe.row.image.as_deref()).await?,
    }))
}
