use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::store::LocalStore;
use crate::core::downloader::MirrorSet;
use crate::core::error::{SyncError, SyncResult};
use crate::core::maven::{Coordinate, MetadataDocument};

/// Where an artifact came from during this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// Already present in the local store; never re-validated.
    Cached(PathBuf),
    /// Downloaded from a mirror in this run.
    Fetched(PathBuf),
}

impl Materialized {
    pub fn path(&self) -> &PathBuf {
        match self {
            Materialized::Cached(p) | Materialized::Fetched(p) => p,
        }
    }
}

/// Read-before-fetch access to repository files.
///
/// Metadata documents are re-fetched once older than `metadata_max_age`;
/// descriptors and artifacts are permanent once stored. Without mirrors the
/// repository is offline and serves whatever the store holds.
///
/// Each store path has its own lock, held from the existence check through
/// the download and write, so concurrent callers asking for the same file
/// fetch it once and never read a partially written copy.
pub struct Repository {
    store: LocalStore,
    mirrors: Option<MirrorSet>,
    metadata_max_age: Duration,
    path_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Repository {
    pub fn new(store: LocalStore, mirrors: MirrorSet, metadata_max_age: Duration) -> Self {
        Self {
            store,
            mirrors: Some(mirrors),
            metadata_max_age,
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Local-store-only repository; metadata of any age is accepted.
    pub fn offline(store: LocalStore) -> Self {
        Self {
            store,
            mirrors: None,
            metadata_max_age: Duration::MAX,
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn is_offline(&self) -> bool {
        self.mirrors.is_none()
    }

    async fn lock_path(&self, relative_path: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .path_locks
            .lock()
            .await
            .entry(relative_path.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Fetch `relative_path` (and fingerprints) or fail with `NotCached` offline.
    async fn fetch(&self, relative_path: &str) -> SyncResult<Vec<u8>> {
        match &self.mirrors {
            Some(mirrors) => Ok(mirrors
                .fetch_with_fingerprints(&self.store, relative_path)
                .await?
                .bytes),
            None => Err(SyncError::NotCached {
                path: relative_path.to_string(),
            }),
        }
    }

    // ── Metadata ────────────────────────────────────────

    /// Fresh local copy, else a mirror, else a stale local copy.
    pub async fn metadata(&self, coordinate: &Coordinate) -> SyncResult<MetadataDocument> {
        let relative_path = coordinate.metadata_path();
        let _guard = self.lock_path(&relative_path).await;

        let text = if self.store.is_fresh(&relative_path, self.metadata_max_age) {
            debug!("Metadata cache hit: {}", relative_path);
            self.store.read_to_string(&relative_path).await?
        } else {
            match self.fetch(&relative_path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) if self.store.contains(&relative_path) => {
                    warn!("Using stale {} ({})", relative_path, e);
                    self.store.read_to_string(&relative_path).await?
                }
                Err(e) => return Err(e),
            }
        };

        let metadata = MetadataDocument::parse(&text)?;
        if let Some(updated) = metadata.last_updated_at() {
            debug!("{} last updated {}", relative_path, updated);
        }
        Ok(metadata)
    }

    /// The coordinate's own version, or the one selected from its metadata.
    pub async fn resolve_version(&self, coordinate: &Coordinate) -> SyncResult<String> {
        if coordinate.has_version() {
            return Ok(coordinate.version.clone());
        }
        let metadata = self.metadata(coordinate).await?;
        Ok(metadata.select_version()?.to_string())
    }

    // ── Descriptors & artifacts ─────────────────────────

    /// Descriptor text from the store, fetching it only when absent.
    pub async fn descriptor(&self, relative_path: &str) -> SyncResult<String> {
        let _guard = self.lock_path(relative_path).await;
        if self.store.contains(relative_path) {
            return self.store.read_to_string(relative_path).await;
        }
        let bytes = self.fetch(relative_path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Make sure an artifact exists in the store.
    pub async fn artifact(&self, relative_path: &str) -> SyncResult<Materialized> {
        let local = self.store.path(relative_path)?;
        let _guard = self.lock_path(relative_path).await;
        if local.is_file() {
            return Ok(Materialized::Cached(local));
        }
        self.fetch(relative_path).await?;
        Ok(Materialized::Fetched(local))
    }
}
