//! Authentication module for presswatch.
//!
//! This module provides password hashing, input validation, user
//! registration, login and signed session tokens.

mod login;
mod password;
mod registration;
mod token;
pub mod validation;

pub use login::{login, LoginError, INVALID_CREDENTIALS_MESSAGE};
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{register, RegistrationError, RegistrationRequest};
pub use token::{SessionClaims, TokenError, TokenService, DEFAULT_TOKEN_EXPIRY_DAYS};
pub use validation::ValidationError;
