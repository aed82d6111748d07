//! Credential storage: the immutable snapshot and its loader.

pub mod credentials;
pub mod loader;

pub use credentials::{credential_digest, CredentialStore};
pub use loader::{load_store, parse_credentials, read_store, LoadError};
