//! User model.

use serde::Serialize;

/// Normalize an email address for storage and lookup.
///
/// ```
/// use presswatch::db::normalize_email;
///
/// assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
/// ```
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address (unique, normalized).
    pub email: String,
    /// Password hash (Argon2).
    pub password_hash: String,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// The fields that may be shown to clients.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// User fields safe to return from the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address; normalized on construction.
    pub email: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password_hash: String,
}

impl NewUser {
    /// Create a new user record.
    pub fn new(
        name: impl Into<String>,
        email: &str,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
        }
    }
}
