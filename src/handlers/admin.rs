use axum::{Json, extract::State, http::{HeaderMap, header}};
use std::sync::Arc;
use tracing::info;
use crate::error::ApiError;
use crate::models::SweepReport;
use crate::state::AppState;

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state.admin_token.as_deref().ok_or(ApiError::Unauthorized)?;
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

pub async fn sweep_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, ApiError> {
    authorize(&state, &headers)?;
    let removed = state.cache.sweep_expired();
    info!(removed, "admin sweep");
    Ok(Json(SweepReport { removed }))
}

pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SweepReport>, ApiError> {
    authorize(&state, &headers)?;
    let removed = state.cache.clear_all();
    info!(removed, "admin cleared cache");
    Ok(Json(SweepReport { removed }))
}
