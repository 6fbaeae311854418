use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;
use validator::Validate;

use super::{
    dto::{TokenRequest, TokenResponse},
    jwt::JwtKeys,
    services::{authenticate, issue_token},
};
use crate::{
    error::{AppError, AppJson},
    state::AppState,
};

pub fn token_routes() -> Router<AppState> {
    Router::new().route("/user/token/", post(create_token))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate()?;
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::field("non_field_errors", "Email and password are required."));
    };

    let user = authenticate(state.users.as_ref(), &email, &password).await?;
    let token = issue_token(&JwtKeys::from_ref(&state), &user)?;
    Ok(Json(TokenResponse { token }))
}
