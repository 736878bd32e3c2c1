//! Response DTOs for Web API.

use serde::Serialize;

use crate::auth::SessionClaims;
use crate::db::PublicUser;

/// Public user fields as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl From<PublicUser> for UserInfo {
    fn from(user: PublicUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<SessionClaims> for UserInfo {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
        }
    }
}

/// Response to a successful register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Signed session token.
    pub token: String,
    /// The authenticated user.
    pub user: UserInfo,
}

/// Response for the current-user endpoint.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Identity carried by the token.
    pub user: UserInfo,
}
