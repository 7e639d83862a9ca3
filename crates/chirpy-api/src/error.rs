//! Error types for the auth layer and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use chirpy_db::DbError;
use chirpy_types::api::ErrorResponse;

use crate::tokens::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingHeader,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid token: {0}")]
    Token(#[from] TokenError),
    #[error("token has been revoked")]
    Revoked,
    #[error("invalid api key")]
    InvalidApiKey,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),
    #[error("Forbidden: user {subject} does not own this resource")]
    Forbidden { subject: u64 },
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Db(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client. Auth failures all read the same
    /// so callers cannot tell a wrong password from an unknown email.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Auth(_) => "Unauthorized".to_string(),
            ApiError::Forbidden { .. } => "Forbidden".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Db(DbError::NotFound(_)) => "Not found".to_string(),
            ApiError::Db(DbError::Conflict(msg)) => msg.clone(),
            ApiError::Db(_) | ApiError::Internal(_) => "Something went wrong".to_string(),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(err) => ApiError::Internal(format!("token signing failed: {}", err)),
            TokenError::ExpiryOutOfRange => ApiError::Internal("token expiry out of range".to_string()),
            other => ApiError::Auth(AuthError::Token(other)),
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(e: argon2::password_hash::Error) -> Self {
        ApiError::Internal(format!("password hashing failed: {}", e))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("spawn_blocking join error: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("{}", self);
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
