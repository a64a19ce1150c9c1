//! Volatile in-process TTL store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{TtlStore, VaultValue};
use crate::errors::VaultError;

/// In-memory TTL store. Nothing is persisted; values live until cleared.
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: DashMap<String, VaultValue>,
}

impl MemoryVault {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TtlStore for MemoryVault {
    async fn set(&self, key: &str, value: VaultValue) -> Result<(), VaultError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<VaultValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    async fn clear_all(&self) -> Result<(), VaultError> {
        self.entries.clear();
        Ok(())
    }
}
