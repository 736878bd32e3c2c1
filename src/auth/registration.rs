//! User registration.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_registration, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};
use crate::PresswatchError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Email already registered.
    #[error("email already registered")]
    EmailExists,

    /// Password hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<PresswatchError> for RegistrationError {
    fn from(err: PresswatchError) -> Self {
        match err {
            PresswatchError::Conflict(_) => RegistrationError::EmailExists,
            other => RegistrationError::Database(other.to_string()),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password (8-128 characters).
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Register a new user.
///
/// This function:
/// 1. Validates all input fields
/// 2. Checks if the email is already registered
/// 3. Hashes the password
/// 4. Creates the user in the database
///
/// The unique index on `email` is the final arbiter: a concurrent insert that
/// slips past step 2 still surfaces as `EmailExists`.
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> Result<User, RegistrationError> {
    validate_registration(&request.name, &request.email, &request.password)?;

    if repo.email_exists(&request.email).await? {
        return Err(RegistrationError::EmailExists);
    }

    let password_hash = hash_password(&request.password)?;

    let new_user = NewUser::new(request.name.trim(), &request.email, password_hash);
    let user = repo.create(&new_user).await?;

    info!(user_id = user.id, "New user registered");

    Ok(user)
}
