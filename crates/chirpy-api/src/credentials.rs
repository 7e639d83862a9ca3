use std::sync::OnceLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand_core::OsRng;
use tracing::warn;

use crate::error::AuthError;

/// Hash a password with Argon2id and a fresh random salt.
/// Returns the PHC string, which embeds the salt and cost parameters.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(hash)
}

/// Verify `password` against a stored PHC hash.
pub fn check_password(hash: &str, password: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        warn!("Stored password hash is unparseable: {}", e);
        AuthError::InvalidCredentials
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Spend the same verification work as a real login when the email is
/// unknown, then fail. Keeps response time from revealing registered emails.
pub fn reject_unknown_user(password: &str) -> AuthError {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("chirpy-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = check_password(hash, password);
    }
    AuthError::InvalidCredentials
}
