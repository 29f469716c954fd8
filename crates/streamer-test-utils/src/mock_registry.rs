//! In-memory registry mock.
//!
//! Behaves like etcd for the three operations the registrar uses: `put`
//! overwrites, `delete` of an absent key succeeds, `get_prefix` returns keys
//! in lexical order.
//!
//! # Example
//!
//! ```rust,ignore
//! use streamer_test_utils::MockRegistry;
//!
//! let registry = MockRegistry::new().with_entry("/services/other", "10.0.0.1:8081");
//! let registrar = DiscoveryRegistrar::new(Arc::new(registry.clone()), "hls_streamer_");
//!
//! // Every call fails with RegistryError::Connect
//! registry.set_failing(true);
//! ```

use async_trait::async_trait;
use hls_streamer::discovery::ServiceRegistry;
use hls_streamer::errors::RegistryError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Normal,
    /// Every call fails with `RegistryError::Connect`.
    Failing,
    /// Every call never completes.
    Hanging,
}

/// Mock registry for discovery tests.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    inner: Arc<Mutex<MockRegistryInner>>,
}

#[derive(Debug, Default)]
struct MockRegistryInner {
    entries: BTreeMap<String, String>,
    mode: Mode,
    puts: usize,
    deletes: usize,
    gets: usize,
}

impl MockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().mode = if failing { Mode::Failing } else { Mode::Normal };
    }

    /// Make every subsequent call hang forever.
    pub fn set_hanging(&self) {
        self.inner.lock().unwrap().mode = Mode::Hanging;
    }

    /// Current value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().entries.get(key).cloned()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.inner.lock().unwrap().entries.clone()
    }

    pub fn put_count(&self) -> usize {
        self.inner.lock().unwrap().puts
    }

    pub fn delete_count(&self) -> usize {
        self.inner.lock().unwrap().deletes
    }

    pub fn get_count(&self) -> usize {
        self.inner.lock().unwrap().gets
    }

    /// Count the call and report the mode it should run under. The lock is
    /// released before any await.
    fn begin(&self, count: impl FnOnce(&mut MockRegistryInner)) -> Mode {
        let mut inner = self.inner.lock().unwrap();
        count(&mut inner);
        inner.mode
    }
}

async fn apply_mode(mode: Mode) -> Result<(), RegistryError> {
    match mode {
        Mode::Normal => Ok(()),
        Mode::Failing => Err(RegistryError::Connect(
            "mock registry unavailable".to_string(),
        )),
        Mode::Hanging => std::future::pending().await,
    }
}

#[async_trait]
impl ServiceRegistry for MockRegistry {
    async fn put(&self, key: &str, value: &str) -> Result<(), RegistryError> {
        apply_mode(self.begin(|inner| inner.puts += 1)).await?;
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RegistryError> {
        apply_mode(self.begin(|inner| inner.deletes += 1)).await?;
        self.inner.lock().unwrap().entries.remove(key);
        Ok(())
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, RegistryError> {
        apply_mode(self.begin(|inner| inner.gets += 1)).await?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
