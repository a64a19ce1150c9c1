//! Durable TTL store backed by a JSON document.
//!
//! The vault must be bound to a directory with [`DiskVault::bind`] before it
//! does anything. Until then every write is silently skipped and every read
//! reports absence, so callers must not assume disk caching works before
//! binding has run.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{TtlStore, VaultValue};
use crate::errors::VaultError;

/// File name of the durable document inside the bound directory.
pub const VAULT_FILE_NAME: &str = "requestflow-vault.json";

/// Binding context for the disk vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskBinding {
    directory: PathBuf,
}

impl DiskBinding {
    /// Creates a binding to a directory. It is created on bind if missing.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the bound directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the path of the durable document.
    #[must_use]
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(VAULT_FILE_NAME)
    }
}

struct BoundState {
    path: PathBuf,
    entries: HashMap<String, VaultValue>,
}

/// Durable TTL store.
///
/// Reads are served from an in-memory snapshot loaded on bind; every mutation
/// rewrites the document (temp file, then rename).
#[derive(Default)]
pub struct DiskVault {
    state: RwLock<Option<BoundState>>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl DiskVault {
    /// Creates an unbound vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once [`bind`](Self::bind) has succeeded.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state.read().is_some()
    }

    /// Binds the vault to a directory and loads any existing document.
    ///
    /// A document that cannot be decoded is discarded; every TTL record in
    /// it then reads as missing, which callers treat as expired.
    pub async fn bind(&self, binding: DiskBinding) -> Result<(), VaultError> {
        tokio::fs::create_dir_all(binding.directory()).await?;
        let path = binding.file_path();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, VaultValue>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Discarding unreadable vault document"
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = entries.len(), "Disk vault bound");
        *self.state.write() = Some(BoundState { path, entries });
        Ok(())
    }

    /// Applies a mutation to the snapshot and persists the result.
    ///
    /// Skipped when unbound.
    async fn mutate<F>(&self, apply: F) -> Result<(), VaultError>
    where
        F: FnOnce(&mut HashMap<String, VaultValue>),
    {
        {
            let mut state = self.state.write();
            match state.as_mut() {
                Some(bound) => apply(&mut bound.entries),
                None => return Ok(()),
            }
        }
        self.persist().await
    }

    async fn persist(&self) -> Result<(), VaultError> {
        let _guard = self.persist_lock.lock().await;

        // Serialize the latest snapshot while holding the persist lock so the
        // last writer always leaves the newest state on disk.
        let snapshot = {
            let state = self.state.read();
            match state.as_ref() {
                Some(bound) => Some((bound.path.clone(), serde_json::to_vec(&bound.entries)?)),
                None => None,
            }
        };
        let Some((path, bytes)) = snapshot else {
            return Ok(());
        };

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl TtlStore for DiskVault {
    async fn set(&self, key: &str, value: VaultValue) -> Result<(), VaultError> {
        let key = key.to_string();
        self.mutate(move |entries| {
            entries.insert(key, value);
        })
        .await
    }

    async fn get(&self, key: &str) -> Option<VaultValue> {
        self.state
            .read()
            .as_ref()
            .and_then(|bound| bound.entries.get(key).cloned())
    }

    async fn contains_key(&self, key: &str) -> bool {
        self.state
            .read()
            .as_ref()
            .is_some_and(|bound| bound.entries.contains_key(key))
    }

    async fn clear_all(&self) -> Result<(), VaultError> {
        self.mutate(HashMap::clear).await
    }
}

impl std::fmt::Debug for DiskVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskVault")
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}
