//! Signed session tokens.
//!
//! Two classes of HS256 JWT share one secret and are told apart by `iss`:
//! short-lived access tokens authorize API calls, long-lived refresh tokens
//! can only be exchanged for new access tokens. Neither class is accepted
//! where the other is expected.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;

use chirpy_types::api::Claims;

pub const ACCESS_ISSUER: &str = "chirpy-access";
pub const REFRESH_ISSUER: &str = "chirpy-refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn issuer(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_ISSUER,
            TokenKind::Refresh => REFRESH_ISSUER,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::days(60),
        }
    }
}

/// Why a token was rejected. Callers outside the auth layer only ever see
/// an opaque 401; the variants exist for logs and tests.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("wrong issuer: expected {expected}, found {found}")]
    WrongIssuer { expected: &'static str, found: String },
    #[error("subject {0:?} is not a user id")]
    BadSubject(String),
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("expiry out of range")]
    ExpiryOutOfRange,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
}

impl TokenService {
    pub fn new(secret: &str, lifetimes: TokenLifetimes) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    pub fn make_token(
        &self,
        subject: u64,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            iss: kind.issuer().to_string(),
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Mint the access/refresh pair handed out at login.
    pub fn issue_pair(&self, subject: u64, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.make_token(subject, now, expiry(now, self.lifetimes.access)?, TokenKind::Access)?,
            refresh: self.make_token(subject, now, expiry(now, self.lifetimes.refresh)?, TokenKind::Refresh)?,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<u64, TokenError> {
        self.validate(token, TokenKind::Access)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<u64, TokenError> {
        self.validate(token, TokenKind::Refresh)
    }

    /// Exchange a refresh token for a new access token. The new token's
    /// expiry is counted from now, not capped by the refresh token's own.
    /// Revocation is not checked here; see `Guard::refresh`.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, TokenError> {
        let subject = self.validate_refresh_token(refresh_token)?;
        let now = Utc::now();
        self.make_token(subject, now, expiry(now, self.lifetimes.access)?, TokenKind::Access)
    }

    pub(crate) fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed(e.to_string()),
        })?;
        Ok(data.claims)
    }

    fn validate(&self, token: &str, kind: TokenKind) -> Result<u64, TokenError> {
        let claims = self.decode_claims(token)?;

        // jsonwebtoken still accepts `exp == now`; a token is valid only while `exp > now`.
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        if claims.iss != kind.issuer() {
            return Err(TokenError::WrongIssuer {
                expected: kind.issuer(),
                found: claims.iss,
            });
        }

        claims
            .sub
            .parse::<u64>()
            .map_err(|_| TokenError::BadSubject(claims.sub))
    }
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>, TokenError> {
    now.checked_add_signed(lifetime)
        .ok_or(TokenError::ExpiryOutOfRange)
}

/// Read the `exp` claim without checking signature, issuer or expiry.
///
/// Only for housekeeping over tokens that were validated when they were
/// stored. Returns `None` when the token cannot be decoded at all.
pub fn unverified_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}
