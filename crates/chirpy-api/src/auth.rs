use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, info};

use chirpy_db::{Database, DbError};
use chirpy_types::api::{
    CreateUserRequest, LoginRequest, LoginResponse, RefreshResponse, UpdateUserRequest,
};
use chirpy_types::models::User;

use crate::credentials;
use crate::error::ApiError;
use crate::guard::{Guard, extract_bearer};
use crate::metrics::HitCounter;
use crate::middleware::Principal;
use crate::run_blocking;
use crate::tokens::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub guard: Guard,
    pub hits: HitCounter,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, tokens: TokenService, polka_key: String) -> AppState {
        let guard = Guard::new(tokens, db.clone(), polka_key);
        Arc::new(Self {
            db,
            guard,
            hits: HitCounter::default(),
        })
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }
    Ok(())
}

/// POST /api/users
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_credentials(&req.email, &req.password)?;

    let user = run_blocking(move || {
        let password_hash = credentials::hash_password(&req.password)?;
        Ok(state.db.create_user(&req.email, &password_hash)?)
    })
    .await?;

    info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(User::from(user))))
}

/// PUT /api/users
pub async fn update_user(
    State(state): State<AppState>,
    Extension(Principal(user_id)): Extension<Principal>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    require_credentials(&req.email, &req.password)?;

    let user = run_blocking(move || {
        let password_hash = credentials::hash_password(&req.password)?;
        Ok(state.db.update_user(user_id, &req.email, &password_hash)?)
    })
    .await?;

    debug!("Updated credentials for user {}", user.id);
    Ok(Json(user.into()))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    run_blocking(move || {
        let user = match state.db.get_user_by_email(&req.email) {
            Ok(user) => user,
            Err(DbError::NotFound(_)) => {
                debug!("Login attempt for unknown email");
                return Err(credentials::reject_unknown_user(&req.password).into());
            }
            Err(e) => return Err(e.into()),
        };

        credentials::check_password(&user.password_hash, &req.password).inspect_err(|_| {
            debug!("Wrong password for user {}", user.id);
        })?;

        let pair = state.guard.tokens().issue_pair(user.id, Utc::now())?;
        info!("User {} logged in", user.id);

        Ok(Json(LoginResponse {
            user: user.into(),
            token: pair.access,
            refresh_token: pair.refresh,
        }))
    })
    .await
}

/// POST /api/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = run_blocking(move || state.guard.refresh(&headers)).await?;
    Ok(Json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Only a currently valid refresh token can be revoked.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_bearer(&headers)?.to_string();
    let subject = state.guard.tokens().validate_refresh_token(&token)?;

    run_blocking(move || Ok(state.db.revoke_token(&token, Utc::now())?)).await?;

    info!("Revoked a refresh token for user {}", subject);
    Ok(StatusCode::NO_CONTENT)
}
