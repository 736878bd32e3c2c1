//! Credential check for login.

use std::sync::LazyLock;

use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{hash_password, verify_password};
use crate::db::{User, UserRepository};

/// Message shown for every credential failure.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Hash checked against when the email is unknown, so both failure paths
/// cost one Argon2 verification.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("presswatch-unknown-user").ok());

/// Run a verification that always fails, at the cost of a real one.
fn verify_unknown_user(password: &str) {
    if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Login errors.
///
/// Unknown email and wrong password collapse into `InvalidCredentials` so
/// callers cannot tell which one happened.
#[derive(Error, Debug)]
pub enum LoginError {
    /// Email or password missing.
    #[error("email and password are required")]
    MissingCredentials,

    /// Unknown email or wrong password.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Check an email/password pair and return the matching user.
pub async fn login(
    repo: &UserRepository<'_>,
    email: &str,
    password: &str,
) -> Result<User, LoginError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(LoginError::MissingCredentials);
    }

    let user = match repo
        .get_by_email(email)
        .await
        .map_err(|e| LoginError::Database(e.to_string()))?
    {
        Some(user) => user,
        None => {
            verify_unknown_user(password);
            debug!("Login attempt for unknown email");
            return Err(LoginError::InvalidCredentials);
        }
    };

    verify_password(password, &user.password_hash).map_err(|_| {
        debug!(user_id = user.id, "Login attempt with wrong password");
        LoginError::InvalidCredentials
    })?;

    info!(user_id = user.id, "User logged in");

    Ok(user)
}
