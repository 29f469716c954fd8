//! Service discovery.
//!
//! Each streamer instance advertises `<ip>:<port>` under
//! `/services/<prefix><identity>` so clients can find the HLS endpoint for a
//! given camera. The identity is derived from the stream settings, so a
//! restarted instance lands on the same key.

mod etcd;
mod identity;
mod registrar;
mod registry;

pub use etcd::{EtcdRegistry, CONNECT_TIMEOUT, OPERATION_TIMEOUT, REQUEST_TIMEOUT};
pub use identity::StreamIdentity;
pub use registrar::{DiscoveryRegistrar, RegistryEntry, SERVICES_ROOT};
pub use registry::ServiceRegistry;
