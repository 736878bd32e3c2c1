//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest, TokenService};
use crate::db::UserRepository;
use crate::web::dto::{AuthResponse, LoginRequest, MeResponse, RegisterRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: Database,
    /// Token signer.
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, tokens: Arc<TokenService>) -> Self {
        Self { db, tokens }
    }
}

/// POST /api/register - Create an account and sign the user in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let repo = UserRepository::new(state.db.pool());

    let user = auth::register(
        &repo,
        RegistrationRequest::new(req.name, req.email, req.password),
    )
    .await?;

    let token = state.tokens.issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.public().into(),
        }),
    ))
}

/// POST /api/login - Exchange credentials for a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let repo = UserRepository::new(state.db.pool());

    let user = auth::login(&repo, &req.email, &req.password).await?;
    let token = state.tokens.issue(&user)?;

    Ok(Json(AuthResponse {
        token,
        user: user.public().into(),
    }))
}

/// GET /api/me - Identity carried by the bearer token.
///
/// Answered from the token claims alone; the database is not consulted.
pub async fn me(AuthUser(claims): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: claims.into(),
    })
}

/// GET /health - Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
