//! Request authorization: who is calling, and may they touch this resource.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use tracing::debug;

use chirpy_db::Database;

use crate::error::{ApiError, AuthError};
use crate::tokens::TokenService;

const BEARER_SCHEME: &str = "Bearer ";
const API_KEY_SCHEME: &str = "ApiKey ";

/// Token from an `Authorization: Bearer <token>` header.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    extract_credential(headers, BEARER_SCHEME)
}

/// Key from an `Authorization: ApiKey <key>` header.
pub fn extract_api_key(headers: &HeaderMap) -> Result<&str, AuthError> {
    extract_credential(headers, API_KEY_SCHEME)
}

fn extract_credential<'a>(headers: &'a HeaderMap, scheme: &str) -> Result<&'a str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix(scheme))
        .filter(|credential| !credential.is_empty() && !credential.contains(char::is_whitespace))
        .ok_or(AuthError::MissingHeader)
}

/// Only the author of a chirp may mutate it.
pub fn authorize_owner(subject: u64, resource_author: u64) -> Result<(), ApiError> {
    if subject == resource_author {
        Ok(())
    } else {
        Err(ApiError::Forbidden { subject })
    }
}

#[derive(Clone)]
pub struct Guard {
    tokens: TokenService,
    db: Arc<Database>,
    api_key: String,
}

impl Guard {
    pub fn new(tokens: TokenService, db: Arc<Database>, api_key: String) -> Self {
        Self { tokens, db, api_key }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Resolve the principal behind a bearer access token.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<u64, AuthError> {
        let token = extract_bearer(headers)?;
        let subject = self.tokens.validate_access_token(token)?;
        debug!("Authenticated user {}", subject);
        Ok(subject)
    }

    /// A revoked refresh token may still carry a valid signature and expiry,
    /// so the revocation table has to be consulted before refreshing.
    /// Blocks on store I/O.
    pub fn check_revocation_before_refresh(&self, token: &str) -> Result<(), ApiError> {
        if self.db.is_token_revoked(token)? {
            return Err(AuthError::Revoked.into());
        }
        Ok(())
    }

    /// Exchange the bearer refresh token for a new access token. Blocks on store I/O.
    pub fn refresh(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        let token = extract_bearer(headers)?;
        self.check_revocation_before_refresh(token)?;
        Ok(self.tokens.refresh(token)?)
    }

    /// Service-to-service check against the configured static key.
    pub fn validate_api_key(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let presented = extract_api_key(headers)?;
        if constant_time_eq(presented.as_bytes(), self.api_key.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
