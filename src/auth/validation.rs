//! Input validation for account registration.
//!
//! All checks run on trimmed input, except the password which is taken as is.

use thiserror::Error;

use super::password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

/// Maximum display name length.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is missing.
    #[error("name is required")]
    NameEmpty,

    /// Name is too long.
    #[error("name must be at most {MAX_NAME_LENGTH} characters")]
    NameTooLong,

    /// Name contains control characters.
    #[error("name contains invalid characters")]
    NameInvalidChars,

    /// Email is missing.
    #[error("email is required")]
    EmailEmpty,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,

    /// Password is missing.
    #[error("password is required")]
    PasswordEmpty,

    /// Password is too short.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    PasswordTooLong,
}

/// Validate a display name.
///
/// # Examples
///
/// ```
/// use presswatch::auth::validation::validate_name;
///
/// assert!(validate_name("Jane Doe").is_ok());
/// assert!(validate_name("   ").is_err());
/// ```
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameEmpty);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::NameInvalidChars);
    }

    Ok(())
}

/// Validate an email address.
///
/// The check is deliberately shallow: one `@`, a non-empty local part and a
/// dotted domain with no empty labels.
///
/// # Examples
///
/// ```
/// use presswatch::auth::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("").is_err());
/// assert!(validate_email("invalid").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };

    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }

    if domain.split('.').any(|label| label.is_empty()) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate a new password (length counted in characters).
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }

    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }

    Ok(())
}

/// Validate all registration fields at once.
///
/// Returns the first validation error encountered, checking name, then
/// email, then password.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    validate_name(name)?;
    validate_email(email)?;
    validate_new_password(password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Jane").is_ok());
        assert!(validate_name("  Jane Doe  ").is_ok());
        assert_eq!(validate_name(""), Err(ValidationError::NameEmpty));
        assert_eq!(validate_name(" \t "), Err(ValidationError::NameEmpty));
        assert_eq!(
            validate_name(&"x".repeat(101)),
            Err(ValidationError::NameTooLong)
        );
        assert_eq!(
            validate_name("Jane\u{0007}"),
            Err(ValidationError::NameInvalidChars)
        );
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.co.uk").is_ok());
        assert!(validate_email("  padded@example.com  ").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert_eq!(validate_email(""), Err(ValidationError::EmailEmpty));
        assert_eq!(validate_email("   "), Err(ValidationError::EmailEmpty));
        for bad in [
            "plain",
            "@example.com",
            "user@",
            "user@localhost",
            "user@example..com",
            "user@.example.com",
            "a@b@example.com",
            "us er@example.com",
        ] {
            assert_eq!(
                validate_email(bad),
                Err(ValidationError::EmailInvalidFormat),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_validate_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(validate_email(&email), Err(ValidationError::EmailTooLong));
    }

    #[test]
    fn test_validate_new_password() {
        assert_eq!(
            validate_new_password(""),
            Err(ValidationError::PasswordEmpty)
        );
        assert_eq!(
            validate_new_password("1234567"),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(validate_new_password("12345678").is_ok());
        assert_eq!(
            validate_new_password(&"p".repeat(129)),
            Err(ValidationError::PasswordTooLong)
        );
    }

    #[test]
    fn test_validate_registration_order() {
        assert_eq!(
            validate_registration("", "bad", "short"),
            Err(ValidationError::NameEmpty)
        );
        assert_eq!(
            validate_registration("Jane", "bad", "short"),
            Err(ValidationError::EmailInvalidFormat)
        );
        assert_eq!(
            validate_registration("Jane", "jane@example.com", "short"),
            Err(ValidationError::PasswordTooShort)
        );
        assert!(validate_registration("Jane", "jane@example.com", "long enough").is_ok());
    }
}
