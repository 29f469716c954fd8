//! etcd v3 registry.
//!
//! Every operation opens its own connection, performs one RPC and drops the
//! client before returning. Registration happens twice per process lifetime,
//! so there is no long-lived connection to keep healthy.

use super::registry::ServiceRegistry;
use crate::errors::RegistryError;
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, GetOptions};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bound on establishing the gRPC channel.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Bound on a single RPC.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on a whole operation (connect plus RPC). The channel may connect
/// lazily, in which case the per-request timeout does not cover waiting for
/// an endpoint to become ready.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(8);

/// etcd-backed `ServiceRegistry`.
#[derive(Debug, Clone)]
pub struct EtcdRegistry {
    endpoint: String,
}

impl EtcdRegistry {
    /// `endpoint` is `host:port` (scheme optional).
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Client, RegistryError> {
        let options = ConnectOptions::new()
            .with_connect_timeout(CONNECT_TIMEOUT)
            .with_timeout(REQUEST_TIMEOUT);

        Client::connect([self.endpoint.as_str()], Some(options))
            .await
            .map_err(|e| RegistryError::Connect(format!("{}: {e}", self.endpoint)))
    }
}

async fn bounded<T, F>(operation: &'static str, fut: F) -> Result<T, RegistryError>
where
    F: std::future::Future<Output = Result<T, RegistryError>>,
{
    tokio::time::timeout(OPERATION_TIMEOUT, fut)
        .await
        .map_err(|_| RegistryError::Timeout {
            operation,
            timeout_ms: u64::try_from(OPERATION_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        })?
}

fn rpc_error(operation: &'static str) -> impl FnOnce(etcd_client::Error) -> RegistryError {
    move |e| RegistryError::Rpc {
        operation,
        message: e.to_string(),
    }
}

#[async_trait]
impl ServiceRegistry for EtcdRegistry {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, key = %key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        bounded("put", async {
            let mut client = self.connect().await?;
            client
                .put(key, value, None)
                .await
                .map_err(rpc_error("put"))?;
            debug!(target: "hls.discovery", "etcd put complete");
            Ok::<(), RegistryError>(())
        })
        .await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, key = %key))]
    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        bounded("delete", async {
            let mut client = self.connect().await?;
            let response = client
                .delete(key, None)
                .await
                .map_err(rpc_error("delete"))?;
            debug!(target: "hls.discovery", deleted = response.deleted(), "etcd delete complete");
            Ok::<(), RegistryError>(())
        })
        .await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint, prefix = %prefix))]
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, RegistryError> {
        let response = bounded("get", async {
            let mut client = self.connect().await?;
            client
                .get(prefix, Some(GetOptions::new().with_prefix()))
                .await
                .map_err(rpc_error("get"))
        })
        .await?;

        response
            .kvs()
            .iter()
            .map(|kv| {
                let key = kv
                    .key_str()
                    .map_err(|e| RegistryError::InvalidData(format!("key: {e}")))?;
                let value = kv
                    .value_str()
                    .map_err(|e| RegistryError::InvalidData(format!("value of {key}: {e}")))?;
                Ok((key.to_string(), value.to_string()))
            })
            .collect()
    }
}
