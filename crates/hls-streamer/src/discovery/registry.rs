//! Key-value registry seam.
//!
//! The registrar only needs three operations from the store. Production uses
//! etcd; tests use an in-memory map.

use crate::errors::RegistryError;
use async_trait::async_trait;

/// Minimal key-value registry.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), RegistryError>;

    /// Every key/value pair whose key starts with `prefix`.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, RegistryError>;
}
