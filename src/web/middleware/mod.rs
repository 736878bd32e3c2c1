//! Middleware for Web API.

pub mod auth;
pub mod cors;

pub use auth::{bearer_token, token_auth, AuthUser};
pub use cors::create_cors_layer;
