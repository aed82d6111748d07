//! Response hardening headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds hardening headers to every response.
///
/// - **Cache-Control: no-store**
///   An auth decision is per request; no proxy or client may replay a
///   cached 200 for a different caller.
///
/// - **X-Content-Type-Options: nosniff**
///   Forces clients to respect the declared Content-Type.
///
/// Applied identically to accepted and rejected verifications, so headers
/// never reveal why a request was denied.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use hashgate::middleware::security_headers;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(security_headers));
/// ```
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );

    response
}
