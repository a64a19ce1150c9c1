//! Test fixtures.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::HandlerConfig;
use crate::core::Response;
use crate::errors::VaultError;
use crate::stream::ResponseSubscriber;
use crate::vault::{CacheBackend, DiskBinding, DiskVault, MemoryVault, Vaults};

/// A config without a minimum duration, keeping TTL records in memory.
#[must_use]
pub fn fast_config() -> HandlerConfig {
    HandlerConfig::new()
        .with_min_duration(Duration::ZERO)
        .with_default_backend(CacheBackend::Memory)
}

/// Receives exactly `count` responses from `subscriber`.
///
/// # Panics
///
/// Panics when the responses do not arrive within `wait` or the stream closes
/// early.
pub async fn collect_responses<T>(
    subscriber: &mut ResponseSubscriber<T>,
    count: usize,
    wait: Duration,
) -> Vec<Response<T>>
where
    T: Clone + Send + Sync + 'static,
{
    let mut received = Vec::with_capacity(count);
    while received.len() < count {
        match tokio::time::timeout(wait, subscriber.next()).await {
            Ok(Some(response)) => received.push(response),
            Ok(None) => panic!(
                "Stream closed after {} of {} responses",
                received.len(),
                count
            ),
            Err(_) => panic!(
                "Timed out after {} of {} responses",
                received.len(),
                count
            ),
        }
    }
    received
}

/// Vaults whose durable medium lives in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
#[derive(Debug)]
pub struct TestVaults {
    vaults: Vaults,
    dir: TempDir,
}

impl TestVaults {
    /// Creates fresh vaults with a bound disk vault.
    pub async fn new() -> Result<Self, VaultError> {
        let dir = TempDir::new()?;
        let disk = Arc::new(DiskVault::new());
        disk.bind(DiskBinding::new(dir.path())).await?;
        let vaults = Vaults::new(Arc::new(MemoryVault::new()), disk);
        Ok(Self { vaults, dir })
    }

    /// Returns the vaults.
    #[must_use]
    pub fn vaults(&self) -> &Vaults {
        &self.vaults
    }

    /// Returns the binding of the durable medium.
    #[must_use]
    pub fn binding(&self) -> DiskBinding {
        DiskBinding::new(self.dir.path())
    }
}
