//! Bearer digest verification against a credential snapshot.

use crate::storage::{credential_digest, CredentialStore};
use subtle::ConstantTimeEq;

/// Internal reason a verification was rejected.
///
/// Reasons are logged server-side only; every variant is reported to the
/// caller as the same bare 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not valid text")]
    MalformedHeader,

    #[error("unsupported authorization scheme")]
    UnsupportedScheme,

    #[error("empty bearer credential")]
    EmptyCredential,

    #[error("unknown digest")]
    UnknownDigest,

    #[error("digest confirmation mismatch for user {0}")]
    DigestMismatch(String),

    #[error("client exceeded failure threshold")]
    Blocked,
}

/// Compare two byte strings in constant time.
///
/// Length mismatch returns early; the length of a hex digest is public.
pub fn constant_time_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Extract the normalized bearer value from an `Authorization` header.
///
/// The scheme is split off on the first run of whitespace and compared
/// case-insensitively; the value is trimmed and lowercased.
pub fn bearer_digest(header: Option<&[u8]>) -> Result<String, Rejection> {
    let raw = header.unwrap_or_default();
    let header = std::str::from_utf8(raw)
        .map_err(|_| Rejection::MalformedHeader)?
        .trim_start();
    if header.is_empty() {
        return Err(Rejection::MissingHeader);
    }

    let (scheme, value) = header
        .split_once(char::is_whitespace)
        .ok_or(Rejection::UnsupportedScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Rejection::UnsupportedScheme);
    }

    let value = value.trim();
    if value.is_empty() {
        return Err(Rejection::EmptyCredential);
    }

    Ok(value.to_ascii_lowercase())
}

/// Resolve raw `Authorization` header bytes to a user in `store`.
pub fn authenticate(store: &CredentialStore, header: Option<&[u8]>) -> Result<String, Rejection> {
    let digest = bearer_digest(header)?;

    let user = store
        .user_for_digest(&digest)
        .ok_or(Rejection::UnknownDigest)?;

    // Re-derive from the same snapshot; only an index bug can fail this
    let expected = store
        .token_for_user(user)
        .map(|token| credential_digest(user, token))
        .unwrap_or_default();

    if !constant_time_eq(digest.as_bytes(), expected.as_bytes()) {
        return Err(Rejection::DigestMismatch(user.to_string()));
    }

    Ok(user.to_string())
}
