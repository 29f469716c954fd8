//! Registration lifecycle for one streamer instance.
//!
//! ```text
//! Unregistered --register--> Registered --deregister--> Unregistered
//! ```
//!
//! The registrar remembers what it wrote so a second `register` with the
//! same key and value is a no-op, and anything else is refused until the held
//! key is deregistered. It never retries; the caller owns that policy.

use super::identity::StreamIdentity;
use super::registry::ServiceRegistry;
use crate::errors::RegistryError;
use crate::observability::metrics::record_registry_operation;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Root under which every service key lives.
pub const SERVICES_ROOT: &str = "/services/";

/// One key/value pair in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub key: String,
    pub value: String,
}

impl fmt::Display for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.key, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RegistrationState {
    Unregistered,
    Registered(RegistryEntry),
}

/// Registers and deregisters this instance's address.
pub struct DiscoveryRegistrar {
    registry: Arc<dyn ServiceRegistry>,
    prefix: String,
    state: Mutex<RegistrationState>,
}

impl DiscoveryRegistrar {
    /// `prefix` is prepended to every identity, e.g. `hls_streamer_`.
    pub fn new(registry: Arc<dyn ServiceRegistry>, prefix: impl Into<String>) -> Self {
        Self {
            registry,
            prefix: prefix.into(),
            state: Mutex::new(RegistrationState::Unregistered),
        }
    }

    /// Full key for `identity`: `/services/<prefix><identity>`.
    #[must_use]
    pub fn service_key(&self, identity: &StreamIdentity) -> String {
        format!("{SERVICES_ROOT}{}{identity}", self.prefix)
    }

    /// Key prefix shared by every instance using this registrar's prefix.
    #[must_use]
    pub fn discovery_prefix(&self) -> String {
        format!("{SERVICES_ROOT}{}", self.prefix)
    }

    /// Whether a registration is currently held.
    pub async fn is_registered(&self) -> bool {
        matches!(*self.state.lock().await, RegistrationState::Registered(_))
    }

    /// Register `identity -> ip:port`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::AlreadyRegistered` if this registrar already holds
    ///   a registration other than this exact key and value.
    /// - Any error from the underlying registry; state is unchanged.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn register(
        &self,
        identity: &StreamIdentity,
        ip: IpAddr,
        port: u16,
    ) -> Result<RegistryEntry, RegistryError> {
        let entry = RegistryEntry {
            key: self.service_key(identity),
            value: SocketAddr::new(ip, port).to_string(),
        };

        let mut state = self.state.lock().await;
        if let RegistrationState::Registered(existing) = &*state {
            if *existing == entry {
                return Ok(entry);
            }
            // One key per registrar, or deregister_with_timeout would leak it
            return Err(RegistryError::AlreadyRegistered {
                key: existing.key.clone(),
                existing: existing.value.clone(),
            });
        }

        match self.registry.put(&entry.key, &entry.value).await {
            Ok(()) => {
                record_registry_operation("register", "success");
                info!(target: "hls.discovery", key = %entry.key, value = %entry.value, "Service registered");
                *state = RegistrationState::Registered(entry.clone());
                Ok(entry)
            }
            Err(e) => {
                record_registry_operation("register", "error");
                warn!(target: "hls.discovery", key = %entry.key, error = %e, "Service registration failed");
                Err(e)
            }
        }
    }

    /// Remove the key for `identity`. An absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns the registry error; the registration is still considered held.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn deregister(&self, identity: &StreamIdentity) -> Result<(), RegistryError> {
        let key = self.service_key(identity);
        let mut state = self.state.lock().await;

        match self.registry.delete(&key).await {
            Ok(()) => {
                record_registry_operation("deregister", "success");
                info!(target: "hls.discovery", key = %key, "Service deregistered");
                if matches!(&*state, RegistrationState::Registered(entry) if entry.key == key) {
                    *state = RegistrationState::Unregistered;
                }
                Ok(())
            }
            Err(e) => {
                record_registry_operation("deregister", "error");
                Err(e)
            }
        }
    }

    /// Shutdown variant of [`deregister`](Self::deregister).
    ///
    /// Never takes longer than `timeout`. Errors and timeouts are logged and
    /// discarded; returns whether the key was removed.
    pub async fn deregister_with_timeout(
        &self,
        identity: &StreamIdentity,
        timeout: Duration,
    ) -> bool {
        match tokio::time::timeout(timeout, self.deregister(identity)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(target: "hls.discovery", identity = %identity, error = %e, "Deregistration failed, continuing shutdown");
                false
            }
            Err(_) => {
                record_registry_operation("deregister", "error");
                warn!(
                    target: "hls.discovery",
                    identity = %identity,
                    timeout = ?timeout,
                    "Deregistration timed out, continuing shutdown"
                );
                false
            }
        }
    }

    /// Every entry whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the registry error.
    pub async fn list_matching(&self, prefix: &str) -> Result<Vec<RegistryEntry>, RegistryError> {
        match self.registry.get_prefix(prefix).await {
            Ok(pairs) => {
                record_registry_operation("list", "success");
                Ok(pairs
                    .into_iter()
                    .map(|(key, value)| RegistryEntry { key, value })
                    .collect())
            }
            Err(e) => {
                record_registry_operation("list", "error");
                Err(e)
            }
        }
    }
}
