//! Operator endpoints.

use crate::auth::{AppState, ReloadSecret};
use crate::error::AppError;
use crate::models::ReloadResponse;
use axum::{extract::State, response::IntoResponse, Json};

/// GET|POST /reload-config : Reload the credential source
///
/// Requires `secret` (query, JSON or form) when a reload secret is configured.
pub async fn reload_config(
    State(state): State<AppState>,
    ReloadSecret(secret): ReloadSecret,
) -> Result<impl IntoResponse, AppError> {
    let loaded_users = state.service.reload(secret.as_deref()).await?;
    Ok(Json(ReloadResponse { loaded_users }))
}
