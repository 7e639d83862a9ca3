use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, info};

use chirpy_types::api::{POLKA_USER_UPGRADED, PolkaWebhookRequest};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// POST /api/polka/webhooks
///
/// The API key is checked before the body is parsed.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    state.guard.validate_api_key(&headers)?;

    let req: PolkaWebhookRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    if req.event != POLKA_USER_UPGRADED {
        debug!("Ignoring Polka event {}", req.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = req.data.user_id;
    run_blocking(move || Ok(state.db.upgrade_user(user_id)?)).await?;

    info!("User {} upgraded to Chirpy Red", user_id);
    Ok(StatusCode::NO_CONTENT)
}
