//! Forward-auth and health endpoints.

use crate::auth::{AppState, ClientKey};
use crate::error::AppError;
use crate::service::Verdict;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};

pub const FORWARDED_USER: &str = "x-forwarded-user";

const HEALTH_BODY: &str = "hashgate is running";

/// ANY /verify : Decide a forwarded request
///
/// Expects `Authorization: Bearer <hex sha256(user:token)>`.
/// 200 with `X-Forwarded-User` on success, bare 401 otherwise.
pub async fn verify(
    State(state): State<AppState>,
    client: ClientKey,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let authorization = headers.get(header::AUTHORIZATION).map(HeaderValue::as_bytes);

    match state.service.verify(authorization, client.as_str()).await {
        Verdict::Authorized(user) => {
            let value = HeaderValue::from_bytes(user.as_bytes())
                .map_err(|e| AppError::Internal(format!("Invalid user header value: {}", e)))?;
            Ok((StatusCode::OK, [(FORWARDED_USER, value)]))
        }
        Verdict::Unauthorized => Err(AppError::Unauthorized),
    }
}

/// GET /health : Liveness probe
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_BODY)
}
