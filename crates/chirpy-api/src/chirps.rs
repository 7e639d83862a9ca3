use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use chirpy_types::api::{CreateChirpRequest, ValidateChirpRequest, ValidateChirpResponse};
use chirpy_types::models::Chirp;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::filter;
use crate::guard::authorize_owner;
use crate::middleware::Principal;
use crate::run_blocking;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<u64>,
    #[serde(default)]
    pub sort: SortOrder,
}

/// POST /api/chirps
pub async fn create_chirp(
    State(state): State<AppState>,
    Extension(Principal(author_id)): Extension<Principal>,
    Json(req): Json<CreateChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = filter::validate_chirp(&req.body)?;

    let chirp = run_blocking(move || Ok(state.db.create_chirp(&body, author_id)?)).await?;

    info!("User {} posted chirp {}", author_id, chirp.id);
    Ok((StatusCode::CREATED, Json(Chirp::from(chirp))))
}

/// GET /api/chirps?author_id=&sort=asc|desc
pub async fn list_chirps(
    State(state): State<AppState>,
    Query(query): Query<ChirpQuery>,
) -> Result<Json<Vec<Chirp>>, ApiError> {
    let rows = run_blocking(move || Ok(state.db.list_chirps()?)).await?;

    let mut chirps: Vec<Chirp> = rows
        .into_iter()
        .filter(|row| query.author_id.is_none_or(|author| row.author_id == author))
        .map(Chirp::from)
        .collect();

    match query.sort {
        SortOrder::Asc => chirps.sort_by_key(|c| c.id),
        SortOrder::Desc => chirps.sort_by(|a, b| b.id.cmp(&a.id)),
    }

    Ok(Json(chirps))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<u64>,
) -> Result<Json<Chirp>, ApiError> {
    let chirp = run_blocking(move || Ok(state.db.get_chirp(chirp_id)?)).await?;
    Ok(Json(chirp.into()))
}

/// DELETE /api/chirps/{chirp_id}
///
/// The ownership check and the delete run as two store calls. That is safe
/// because chirps are never edited and ids are never reissued.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Extension(Principal(user_id)): Extension<Principal>,
    Path(chirp_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || {
        let chirp = state.db.get_chirp(chirp_id)?;
        authorize_owner(user_id, chirp.author_id)?;
        state.db.delete_chirp(chirp_id)?;
        Ok(())
    })
    .await?;

    info!("User {} deleted chirp {}", user_id, chirp_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/validate_chirp
pub async fn validate_chirp(
    Json(req): Json<ValidateChirpRequest>,
) -> Result<Json<ValidateChirpResponse>, ApiError> {
    let cleaned_body = filter::validate_chirp(&req.body)?;
    Ok(Json(ValidateChirpResponse { cleaned_body }))
}
