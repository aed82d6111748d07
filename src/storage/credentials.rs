//! Immutable credential snapshot.
//!
//! A [`CredentialStore`] holds the `user -> token` table together with a
//! precomputed reverse index from bearer digest to user. Snapshots are never
//! mutated after construction; reloads build a fresh one and swap it in.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Compute the bearer digest for a credential: lowercase hex SHA-256 of
/// `user || ":" || token`.
pub fn credential_digest(user: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.as_bytes());
    hasher.update(b":");
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// One full credential snapshot.
#[derive(Debug, Default)]
pub struct CredentialStore {
    users_to_tokens: HashMap<String, String>,
    digest_to_user: HashMap<String, String>,
}

impl CredentialStore {
    /// Store with zero users. Used when the credential source is missing
    /// or unreadable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from `(user, token)` entries in source order.
    ///
    /// User identifiers must already be unique. If two users produce the
    /// same digest, the first entry keeps the index slot and the later user
    /// is unreachable through digest lookup.
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        Self::build(entries, credential_digest)
    }

    fn build<F>(entries: Vec<(String, String)>, digest: F) -> Self
    where
        F: Fn(&str, &str) -> String,
    {
        let mut users_to_tokens = HashMap::with_capacity(entries.len());
        let mut digest_to_user = HashMap::with_capacity(entries.len());

        for (user, token) in entries {
            let hash = digest(&user, &token);
            match digest_to_user.get(&hash) {
                Some(existing) => {
                    tracing::warn!(
                        action = "digest_collision",
                        kept = %existing,
                        shadowed = %user,
                        "Digest collision; keeping first user"
                    );
                }
                None => {
                    digest_to_user.insert(hash, user.clone());
                }
            }
            users_to_tokens.insert(user, token);
        }

        Self {
            users_to_tokens,
            digest_to_user,
        }
    }

    /// Number of users in this snapshot.
    pub fn user_count(&self) -> usize {
        self.users_to_tokens.len()
    }

    /// Number of entries in the digest index.
    pub fn digest_count(&self) -> usize {
        self.digest_to_user.len()
    }

    /// O(1) lookup of a normalized (lowercase hex) digest.
    pub fn user_for_digest(&self, digest: &str) -> Option<&str> {
        self.digest_to_user.get(digest).map(String::as_str)
    }

    pub fn token_for_user(&self, user: &str) -> Option<&str> {
        self.users_to_tokens.get(user).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(u, t)| (u.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_digest_is_sha256_of_user_colon_token() {
        // sha256("alice:s3cr3t")
        let digest = credential_digest("alice", "s3cr3t");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let mut hasher = Sha256::new();
        hasher.update(b"alice:s3cr3t");
        assert_eq!(digest, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_digest_separator_matters() {
        assert_ne!(credential_digest("ab", "c"), credential_digest("a", "bc"));
    }

    #[test]
    fn test_index_maps_digest_to_user() {
        let store = CredentialStore::from_entries(entries(&[("alice", "one"), ("bob", "two")]));
        assert_eq!(store.user_count(), 2);
        assert_eq!(store.digest_count(), 2);

        let digest = credential_digest("bob", "two");
        assert_eq!(store.user_for_digest(&digest), Some("bob"));
        assert_eq!(store.token_for_user("bob"), Some("two"));
        assert_eq!(store.user_for_digest("deadbeef"), None);
    }

    #[test]
    fn test_collision_keeps_first_user() {
        // Force every entry onto the same digest
        let store = CredentialStore::build(
            entries(&[("first", "a"), ("second", "b")]),
            |_, _| "same".to_string(),
        );

        assert_eq!(store.user_count(), 2);
        assert_eq!(store.digest_count(), 1);
        assert_eq!(store.user_for_digest("same"), Some("first"));
    }

    #[test]
    fn test_empty_store() {
        let store = CredentialStore::empty();
        assert_eq!(store.user_count(), 0);
        assert_eq!(store.digest_count(), 0);
    }
}
