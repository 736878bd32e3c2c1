//! presswatch - industry news dashboard backend
//!
//! Aggregates RSS/Atom feeds into the dashboard's data files, serves a small
//! account API, and watches a mailbox for keyword matches.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod monitor;
pub mod web;

pub use auth::{
    hash_password, login, register, validate_password, verify_password, LoginError,
    PasswordError, RegistrationError, RegistrationRequest, SessionClaims, TokenError,
    TokenService, ValidationError,
};
pub use config::{Config, FeedSource, FeedsConfig, MonitorConfig, WebConfig};
pub use db::{Database, NewUser, PublicUser, User, UserRepository};
pub use error::{PresswatchError, Result};
pub use feed::{Article, FeedDocument, Pipeline, PipelineReport};
pub use monitor::{MonitorOptions, MonitorReport};
pub use web::WebServer;
