//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::not_empty_trimmed;

/// Registration request.
///
/// Missing fields deserialize as empty strings so they are reported as
/// validation failures rather than JSON errors.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub name: String,
    /// Email address.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Password.
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[serde(default)]
    #[validate(custom(function = "not_empty_trimmed"))]
    pub email: String,
    /// Password.
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}
