//! The verification service: owns the current credential snapshot and the
//! abuse guard, and defines the verify and reload operations over them.

use crate::auth::{authenticate, constant_time_eq, AbuseGuard, Rejection};
use crate::config::Config;
use crate::storage::{load_store, CredentialStore};
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a verification as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Authorized(String),
    Unauthorized,
}

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("reload secret missing or invalid")]
    Forbidden,
}

pub struct AuthService {
    store: ArcSwap<CredentialStore>,
    guard: AbuseGuard,
    source: PathBuf,
    reload_secret: Option<String>,
    // Serializes reloads so there is exactly one writer
    reload_lock: tokio::sync::Mutex<()>,
}

impl AuthService {
    pub fn new(
        store: CredentialStore,
        guard: AbuseGuard,
        source: PathBuf,
        reload_secret: Option<String>,
    ) -> Self {
        Self {
            store: ArcSwap::from_pointee(store),
            guard,
            source,
            reload_secret,
            reload_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Build the service and perform the initial credential load.
    pub async fn from_config(config: &Config) -> Self {
        let store = load_store(&config.credentials_path).await;
        Self::new(
            store,
            AbuseGuard::new(config.guard_policy()),
            config.credentials_path.clone(),
            config.reload_secret.clone(),
        )
    }

    /// The snapshot currently visible to verifications.
    pub fn snapshot(&self) -> Arc<CredentialStore> {
        self.store.load_full()
    }

    pub fn user_count(&self) -> usize {
        self.store.load().user_count()
    }

    pub fn guard(&self) -> &AbuseGuard {
        &self.guard
    }

    /// Decide a verification without applying any penalty.
    ///
    /// On success the client's failure history is cleared.
    pub fn check(&self, header: Option<&[u8]>, client: &str) -> Result<String, Rejection> {
        if self.guard.is_blocked(client) {
            return Err(Rejection::Blocked);
        }

        let store = self.store.load();
        let user = authenticate(&store, header)?;
        self.guard.clear(client);
        Ok(user)
    }

    /// Verify raw `Authorization` header bytes for `client`.
    ///
    /// Rejections record a failure and wait out the resulting delay before
    /// returning. If the caller drops this future during the wait, the
    /// failure stays recorded.
    pub async fn verify(&self, header: Option<&[u8]>, client: &str) -> Verdict {
        match self.check(header, client) {
            Ok(user) => {
                tracing::debug!(action = "verify_ok", user = %user, client = %client, "Verified");
                Verdict::Authorized(user)
            }
            Err(reason) => {
                let penalty = self.guard.penalize(client);
                let delay_ms = u64::try_from(penalty.delay.as_millis()).unwrap_or(u64::MAX);
                match &reason {
                    Rejection::DigestMismatch(_) | Rejection::Blocked => tracing::warn!(
                        action = "verify_rejected",
                        reason = %reason,
                        client = %client,
                        attempts = penalty.attempts,
                        delay_ms,
                        "Verification rejected"
                    ),
                    _ => tracing::info!(
                        action = "verify_rejected",
                        reason = %reason,
                        client = %client,
                        attempts = penalty.attempts,
                        delay_ms,
                        "Verification rejected"
                    ),
                }
                tokio::time::sleep(penalty.delay).await;
                Verdict::Unauthorized
            }
        }
    }

    /// Reload the credential source and publish it atomically.
    ///
    /// Returns the number of users in the new snapshot. In-flight
    /// verifications finish against the snapshot they already hold.
    pub async fn reload(&self, provided: Option<&str>) -> Result<usize, ReloadError> {
        self.authorize_reload(provided)?;

        let _writer = self.reload_lock.lock().await;
        let store = load_store(&self.source).await;
        let count = store.user_count();
        self.store.store(Arc::new(store));

        tracing::info!(action = "reload", users = count, "Credential store replaced");
        Ok(count)
    }

    fn authorize_reload(&self, provided: Option<&str>) -> Result<(), ReloadError> {
        let Some(expected) = self.reload_secret.as_deref() else {
            return Ok(());
        };

        match provided {
            Some(p) if !p.is_empty() && constant_time_eq(p.as_bytes(), expected.as_bytes()) => {
                Ok(())
            }
            _ => {
                tracing::warn!(action = "reload_forbidden", "Reload rejected");
                Err(ReloadError::Forbidden)
            }
        }
    }
}
