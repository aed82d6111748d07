//! Axum extractors for client bucketing and reload authentication.

use crate::models::SecretParams;
use crate::service::AuthService;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, Method},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Fallback bucket when no client address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
}

/// Anti-abuse bucketing key for the caller.
///
/// First entry of `X-Forwarded-For` (set by the fronting proxy), else the
/// peer IP, else [`UNKNOWN_CLIENT`]. This is not an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty());

        if let Some(first) = forwarded {
            return ClientKey(first.to_string());
        }

        match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => ClientKey(addr.ip().to_string()),
            None => ClientKey(UNKNOWN_CLIENT.to_string()),
        }
    }
}

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientKey::from_parts(parts))
    }
}

/// Reload secret supplied by the caller, if any.
///
/// Looked up in the `secret` query parameter first; for POST requests the
/// body is then tried as JSON, then as an urlencoded form. Unparseable input
/// counts as no secret.
#[derive(Debug, Default)]
pub struct ReloadSecret(pub Option<String>);

impl<S> FromRequest<S> for ReloadSecret
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let query = Query::<SecretParams>::from_request_parts(&mut parts, state)
            .await
            .ok()
            .and_then(|Query(params)| params.secret);
        if query.is_some() || parts.method != Method::POST {
            return Ok(ReloadSecret(query));
        }

        let req = Request::from_parts(parts, body);
        let secret = match Bytes::from_request(req, state).await {
            Ok(bytes) => secret_from_body(&bytes),
            Err(_) => None,
        };

        Ok(ReloadSecret(secret))
    }
}

/// JSON is tried first whatever the declared content type, then an
/// urlencoded form.
fn secret_from_body(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<SecretParams>(bytes)
        .ok()
        .or_else(|| serde_urlencoded::from_bytes::<SecretParams>(bytes).ok())
        .and_then(|params| params.secret)
}
