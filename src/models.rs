//! Request and response models for the API.

use serde::{Deserialize, Serialize};

/// Reload secret as supplied via query string, JSON body or form body.
#[derive(Debug, Default, Deserialize)]
pub struct SecretParams {
    pub secret: Option<String>,
}

/// Response after a successful reload.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub loaded_users: usize,
}
