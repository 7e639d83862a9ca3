//! HTTP layer and authentication for Chirpy.
//!
//! `credentials` hashes passwords, `tokens` issues and validates JWTs,
//! `guard` ties both to the store for bearer, ownership, revocation and
//! API-key checks. The remaining modules are axum handlers and wiring.

pub mod auth;
pub mod chirps;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod guard;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod tokens;
pub mod webhooks;

pub use auth::{AppState, AppStateInner};
pub use error::{ApiError, AuthError};
pub use routes::router;

/// Run blocking store or hashing work off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
