use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::AppState;
use crate::error::ApiError;

/// The authenticated user id, inserted as a request extension by `require_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub u64);

/// Validate the bearer access token and attach the caller's `Principal`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = state.guard.authenticate(req.headers())?;
    req.extensions_mut().insert(Principal(user_id));
    Ok(next.run(req).await)
}
