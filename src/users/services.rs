use tracing::info;

use super::{
    repo::UserRepo,
    repo_types::{NewUser, User, UserChanges},
};
use crate::{
    auth::password::{hash_password, unusable_password},
    config::AdminBootstrap,
    error::AppError,
};

pub const EMAIL_TAKEN: &str = "A user with this email already exists.";

/// Optional columns accepted alongside email and password.
#[derive(Debug, Clone)]
pub struct AccountFields {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for AccountFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

/// Trims the address and lower-cases the domain part; the local part keeps its case.
pub fn normalize_email(email: &str) -> String {
    let trimmed = email.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => trimmed.to_string(),
    }
}

fn map_email_conflict(e: AppError) -> AppError {
    match e {
        AppError::Conflict("email") => AppError::field("email", EMAIL_TAKEN),
        other => other,
    }
}

pub async fn create_account(
    users: &dyn UserRepo,
    email: &str,
    password: Option<&str>,
    fields: AccountFields,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::field("email", "User must have an email address."));
    }

    let password_hash = match password {
        Some(plain) => hash_password(plain)?,
        None => unusable_password(),
    };

    let user = users
        .insert(NewUser {
            email,
            name: fields.name,
            password_hash,
            is_active: fields.is_active,
            is_staff: fields.is_staff,
            is_superuser: fields.is_superuser,
        })
        .await
        .map_err(map_email_conflict)?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn elevate_to_admin(users: &dyn UserRepo, email: &str, password: &str) -> Result<User, AppError> {
    let admin = create_account(
        users,
        email,
        Some(password),
        AccountFields {
            is_staff: true,
            is_superuser: true,
            ..Default::default()
        },
    )
    .await?;

    info!(user_id = %admin.id, "superuser created");
    Ok(admin)
}

/// Profile changes from `PUT`/`PATCH /user/me/`.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

pub async fn update_account(users: &dyn UserRepo, user: &User, update: AccountUpdate) -> Result<User, AppError> {
    let password_hash = match update.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };
    let changes = UserChanges {
        email: update.email.as_deref().map(normalize_email),
        name: update.name,
        password_hash,
        ..Default::default()
    };

    let updated = users
        .update(user.id, changes)
        .await
        .map_err(map_email_conflict)?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    info!(user_id = %updated.id, "user updated");
    Ok(updated)
}

pub async fn delete_account(users: &dyn UserRepo, user: &User) -> Result<(), AppError> {
    if !users.delete(user.id).await? {
        return Err(AppError::NotFound("User not found.".into()));
    }
    info!(user_id = %user.id, "user deleted");
    Ok(())
}

/// Creates the configured superuser unless the email is already registered.
pub async fn ensure_admin(users: &dyn UserRepo, admin: &AdminBootstrap) -> Result<(), AppError> {
    if users.find_by_email(&normalize_email(&admin.email)).await?.is_some() {
        info!(email = %admin.email, "superuser already present");
        return Ok(());
    }
    elevate_to_admin(users, &admin.email, &admin.password).await?;
    Ok(())
}
