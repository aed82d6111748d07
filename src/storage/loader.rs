//! Credential source loading.
//!
//! Source format: UTF-8 text, one `user:token` record per line. Blank lines
//! and lines starting with `#` are ignored. Malformed records are skipped
//! with a warning; a missing or unreadable source degrades to an empty store.

use super::credentials::CredentialStore;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Credential source not found: {0}")]
    NotFound(String),

    #[error("Failed to read credential source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("missing ':' separator")]
    MissingSeparator,

    #[error("empty user or token")]
    EmptyField,

    #[error("user contains control characters")]
    InvalidUser,
}

/// Parse credential records, returning unique `(user, token)` pairs in
/// first-seen order.
///
/// A repeated user replaces the earlier token but keeps its original
/// position.
pub fn parse_credentials(text: &str) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (user, token) = match parse_line(line) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(line = line_no, reason = %e, "Skipping invalid credential line");
                continue;
            }
        };

        match positions.get(user) {
            Some(&pos) => {
                tracing::warn!(line = line_no, user = %user, "Duplicate user; later record wins");
                entries[pos].1 = token.to_string();
            }
            None => {
                positions.insert(user.to_string(), entries.len());
                entries.push((user.to_string(), token.to_string()));
            }
        }
    }

    entries
}

fn parse_line(line: &str) -> Result<(&str, &str), LineError> {
    let (user, token) = line.split_once(':').ok_or(LineError::MissingSeparator)?;
    let user = user.trim();
    let token = token.trim();

    if user.is_empty() || token.is_empty() {
        return Err(LineError::EmptyField);
    }
    if user.chars().any(char::is_control) {
        return Err(LineError::InvalidUser);
    }

    Ok((user, token))
}

/// Read and parse the credential source at `path`.
pub async fn read_store(path: &Path) -> Result<CredentialStore, LoadError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.display().to_string())
        } else {
            LoadError::Io {
                path: path.display().to_string(),
                source: e,
            }
        }
    })?;

    Ok(CredentialStore::from_entries(parse_credentials(&text)))
}

/// Load the credential source, degrading to an empty store on any failure.
pub async fn load_store(path: &Path) -> CredentialStore {
    let store = match read_store(path).await {
        Ok(store) => store,
        Err(e @ LoadError::NotFound(_)) => {
            tracing::warn!(error = %e, "No users loaded");
            CredentialStore::empty()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load credentials; no users loaded");
            CredentialStore::empty()
        }
    };

    tracing::info!(
        users = store.user_count(),
        digests = store.digest_count(),
        path = %path.display(),
        "Credentials loaded"
    );

    store
}
