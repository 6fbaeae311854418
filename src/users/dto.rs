use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::repo_types::User;
use crate::{error::FieldErrors, validation::reject_blank};

/// Body for `POST /user/create/` and `PUT /user/me/`: every field required.
#[derive(Debug, Deserialize, Validate)]
pub struct AccountRequest {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(min = 5, message = "Ensure this field has at least 5 characters.")
    )]
    pub password: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub name: Option<String>,
}

impl AccountRequest {
    pub fn check(&self) -> FieldErrors {
        let mut errors = self.validate().err().map(FieldErrors::from).unwrap_or_default();
        reject_blank(&mut errors, "name", self.name.as_deref());
        errors
    }
}

/// Body for `PATCH /user/me/`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AccountPatch {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

impl AccountPatch {
    pub fn check(&self) -> FieldErrors {
        let mut errors = self.validate().err().map(FieldErrors::from).unwrap_or_default();
        reject_blank(&mut errors, "name", self.name.as_deref());
        errors
    }
}

/// Public representation; the password never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}
