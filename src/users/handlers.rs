use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{AccountPatch, AccountRequest, UserResponse},
    services::{create_account, delete_account, update_account, AccountFields, AccountUpdate},
};
use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppJson},
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create/", post(create_user))
        .route(
            "/user/me/",
            get(get_me).put(replace_me).patch(patch_me).delete(delete_me),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<AccountRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.check().into_result()?;
    let (Some(email), Some(password), Some(name)) = (payload.email, payload.password, payload.name) else {
        return Err(AppError::BadRequest("email, password and name are required".into()));
    };

    let user = create_account(
        state.users.as_ref(),
        &email,
        Some(&password),
        AccountFields {
            name: name.trim().to_string(),
            ..Default::default()
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn replace_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<AccountRequest>,
) -> Result<Json<UserResponse>, AppError> {
    payload.check().into_result()?;
    let update = AccountUpdate {
        email: payload.email,
        name: payload.name.map(|n| n.trim().to_string()),
        password: payload.password,
    };
    let updated = update_account(state.users.as_ref(), &user, update).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn patch_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<AccountPatch>,
) -> Result<Json<UserResponse>, AppError> {
    payload.check().into_result()?;
    let update = AccountUpdate {
        email: payload.email,
        name: payload.name.map(|n| n.trim().to_string()),
        password: payload.password,
    };
    let updated = update_account(state.users.as_ref(), &user, update).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, AppError> {
    let image_keys = state.recipes.image_keys(user.id).await?;
    delete_account(state.users.as_ref(), &user).await?;

    for key in image_keys {
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, key = %key, "orphaned recipe image");
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
