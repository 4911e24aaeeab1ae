use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::Role;

/// Request body for user registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Missing required fields: email"),
        custom(function = "crate::validation::email")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Missing required fields: password"),
        custom(function = "crate::validation::password")
    )]
    pub password: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Missing required fields: role"),
        custom(function = "crate::validation::signup_role")
    )]
    pub role: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 30,
        message = "Name is required and cannot be longer than 30 symbols"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 30,
        message = "Surname is required and cannot be longer than 30 symbols"
    ))]
    pub surname: String,
}

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields: email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields: password"))]
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing required fields: refresh_token"))]
    pub refresh_token: String,
}

/// Returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub id: i64,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
