//! TTL store capability and its backends.
//!
//! A TTL store is a typed key-value capability holding scalar values
//! (strings, longs, booleans). Cache policies use it to keep the expiration
//! instant of each cached payload, separately from the payload itself.
//!
//! Two backends exist:
//! - [`MemoryVault`]: a volatile in-process map
//! - [`DiskVault`]: a durable document bound once with [`DiskBinding`]
//!
//! Both are bundled in [`Vaults`], which is injected into request handlers.
//! [`Vaults::global`] returns the process-wide pair driven by [`init`] and
//! [`clear_all`]; tests use [`Vaults::isolated`] instead.

mod disk;
mod memory;

pub use disk::{DiskBinding, DiskVault, VAULT_FILE_NAME};
pub use memory::MemoryVault;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::info;

use crate::errors::VaultError;

/// Which TTL store backend a cache policy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// Volatile in-process store.
    Memory,
    /// Durable store; requires [`init`] before use.
    #[default]
    Disk,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

/// A typed scalar held by a TTL store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VaultValue {
    /// A string value.
    Text(String),
    /// A 64-bit integer value.
    Long(i64),
    /// A boolean value.
    Bool(bool),
}

impl From<String> for VaultValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for VaultValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for VaultValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for VaultValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Typed key-value capability backing TTL records.
///
/// Typed getters return `None` when the key is absent or holds a value of
/// another type.
#[async_trait]
pub trait TtlStore: Send + Sync {
    /// Stores a value, replacing any previous value for the key.
    async fn set(&self, key: &str, value: VaultValue) -> Result<(), VaultError>;

    /// Gets the raw value for a key.
    async fn get(&self, key: &str) -> Option<VaultValue>;

    /// Returns true if the key holds a value of any type.
    async fn contains_key(&self, key: &str) -> bool;

    /// Removes every key.
    async fn clear_all(&self) -> Result<(), VaultError>;

    /// Gets a string value.
    async fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key).await {
            Some(VaultValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Gets a long value.
    async fn get_long(&self, key: &str) -> Option<i64> {
        match self.get(key).await {
            Some(VaultValue::Long(value)) => Some(value),
            _ => None,
        }
    }

    /// Gets a boolean value.
    async fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key).await {
            Some(VaultValue::Bool(value)) => Some(value),
            _ => None,
        }
    }
}

/// The pair of TTL stores a request handler works against.
#[derive(Clone)]
pub struct Vaults {
    memory: Arc<dyn TtlStore>,
    disk: Arc<dyn TtlStore>,
}

struct GlobalVaults {
    memory: Arc<MemoryVault>,
    disk: Arc<DiskVault>,
}

fn global_vaults() -> &'static GlobalVaults {
    static GLOBAL: OnceLock<GlobalVaults> = OnceLock::new();
    GLOBAL.get_or_init(|| GlobalVaults {
        memory: Arc::new(MemoryVault::new()),
        disk: Arc::new(DiskVault::new()),
    })
}

impl Vaults {
    /// Creates a pair from explicit stores.
    #[must_use]
    pub fn new(memory: Arc<dyn TtlStore>, disk: Arc<dyn TtlStore>) -> Self {
        Self { memory, disk }
    }

    /// Returns the process-wide pair.
    #[must_use]
    pub fn global() -> Self {
        let global = global_vaults();
        Self {
            memory: global.memory.clone(),
            disk: global.disk.clone(),
        }
    }

    /// Creates a fresh pair with an unbound disk vault.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            memory: Arc::new(MemoryVault::new()),
            disk: Arc::new(DiskVault::new()),
        }
    }

    /// Returns the store for a backend.
    #[must_use]
    pub fn store(&self, backend: CacheBackend) -> &Arc<dyn TtlStore> {
        match backend {
            CacheBackend::Memory => &self.memory,
            CacheBackend::Disk => &self.disk,
        }
    }

    /// Returns the memory store.
    #[must_use]
    pub fn memory(&self) -> &Arc<dyn TtlStore> {
        &self.memory
    }

    /// Returns the disk store.
    #[must_use]
    pub fn disk(&self) -> &Arc<dyn TtlStore> {
        &self.disk
    }

    /// Clears both stores. Both are attempted; the first error is returned.
    pub async fn clear_all(&self) -> Result<(), VaultError> {
        let memory = self.memory.clear_all().await;
        let disk = self.disk.clear_all().await;
        memory.and(disk)
    }
}

impl Default for Vaults {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Vaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vaults").finish_non_exhaustive()
    }
}

/// Binds the process-wide disk vault. Must run once before disk caching works.
///
/// When `clean_on_start` is true both process-wide stores are cleared.
pub async fn init(binding: DiskBinding, clean_on_start: bool) -> Result<(), VaultError> {
    let global = global_vaults();
    global.disk.bind(binding).await?;
    if clean_on_start {
        info!("Clearing vaults on start");
        Vaults::global().clear_all().await?;
    }
    Ok(())
}

/// Clears both process-wide stores for every key (e.g. on logout).
pub async fn clear_all() -> Result<(), VaultError> {
    Vaults::global().clear_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_backend_default_is_disk() {
        assert_eq!(CacheBackend::default(), CacheBackend::Disk);
        assert_eq!(CacheBackend::Memory.to_string(), "memory");
    }

    #[test]
    fn test_vault_value_serialize() {
        let json = serde_json::to_string(&VaultValue::Long(42)).unwrap();
        assert_eq!(json, r#"{"type":"long","value":42}"#);

        let value: VaultValue = serde_json::from_str(r#"{"type":"bool","value":true}"#).unwrap();
        assert_eq!(value, VaultValue::Bool(true));
    }

    #[tokio::test]
    async fn test_isolated_vaults_are_independent() {
        let first = Vaults::isolated();
        let second = Vaults::isolated();

        first.memory().set("k", VaultValue::Long(1)).await.unwrap();

        assert!(first.memory().contains_key("k").await);
        assert!(!second.memory().contains_key("k").await);
    }

    #[tokio::test]
    async fn test_store_selects_backend() {
        let vaults = Vaults::isolated();
        vaults.store(CacheBackend::Memory).set("k", "v".into()).await.unwrap();

        assert_eq!(vaults.memory().get_string("k").await, Some("v".to_string()));
        // Unbound disk vault ignores everything.
        assert!(!vaults.disk().contains_key("k").await);
    }

    #[tokio::test]
    async fn test_clear_all_clears_memory() {
        let vaults = Vaults::isolated();
        vaults.memory().set("a", true.into()).await.unwrap();

        vaults.clear_all().await.unwrap();

        assert!(vaults.memory().get("a").await.is_none());
    }
}
