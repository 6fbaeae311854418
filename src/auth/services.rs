use tracing::{info, warn};

use super::{jwt::JwtKeys, password::verify_password};
use crate::{
    error::AppError,
    users::{repo::UserRepo, repo_types::User, services::normalize_email},
};

pub const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Returns the active user owning these credentials.
///
/// Unknown email, wrong password, an unusable hash and an inactive account
/// all produce the same `non_field_errors` validation failure.
pub async fn authenticate(users: &dyn UserRepo, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email);
    let rejected = || AppError::field("non_field_errors", INVALID_CREDENTIALS);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(rejected());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(rejected());
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login inactive user");
        return Err(rejected());
    }

    Ok(user)
}

pub fn issue_token(keys: &JwtKeys, user: &User) -> Result<String, AppError> {
    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "token issued");
    Ok(token)
}
