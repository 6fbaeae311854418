use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// JWT payload carried by bearer tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    pub iat: usize, // issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>, // absent for non-expiring tokens
    pub iss: String,
    pub aud: String,
}

/// Request body for `POST /user/token/`.
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
