//! Web API module for presswatch.
//!
//! A small JSON API for account registration, login and identity lookup,
//! authenticated with bearer tokens.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
