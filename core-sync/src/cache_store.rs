//! # Cache Store
//!
//! Persistence for the [`CacheIndex`]: a local JSON file written atomically,
//! plus an optional mirror of the same document in a dedicated remote folder
//! so a fresh machine starts with warm hints.
//!
//! Loading is fail-soft in both directions: a missing, corrupt, or
//! unreachable cache replica degrades to an empty index and the engine
//! re-discovers IDs from the remote. Saving the local file must succeed (a
//! run whose discoveries are lost would redo all its queries next time); the
//! remote mirror is best-effort.

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::storage::{FileSystemAccess, ObjectStore};
use bytes::Bytes;
use core_runtime::config::SyncSettings;
use tracing::{debug, warn};

use crate::cache_index::CacheIndex;
use crate::error::{Result, SyncError};

/// Loads, merges and persists the cache index.
#[derive(Clone)]
pub struct CacheStore {
    fs: Arc<dyn FileSystemAccess>,
    store: Arc<dyn ObjectStore>,
    settings: SyncSettings,
}

impl CacheStore {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        store: Arc<dyn ObjectStore>,
        settings: &SyncSettings,
    ) -> Self {
        CacheStore {
            fs,
            store,
            settings: settings.clone(),
        }
    }

    /// Local path of the persisted cache document.
    pub fn local_path(&self) -> PathBuf {
        self.settings.base_dir.join(&self.settings.cache_file_name)
    }

    /// Load the local replica. Missing or corrupt files yield an empty index.
    pub async fn load_local(&self) -> CacheIndex {
        let path = self.local_path();
        match self.fs.exists(&path).await {
            Ok(true) => {}
            Ok(false) => return CacheIndex::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not probe local cache file");
                return CacheIndex::new();
            }
        }
        match self.fs.read_file(&path).await {
            Ok(data) => CacheIndex::decode_lossy(&data),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read local cache file");
                CacheIndex::new()
            }
        }
    }

    /// Persist the local replica atomically.
    pub async fn save_local(&self, index: &CacheIndex) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)
            .map_err(|e| SyncError::Cache(format!("cache index did not encode: {}", e)))?;

        let dir = self.settings.base_dir.clone();
        self.fs
            .create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::local_io(dir, e))?;

        let path = self.local_path();
        self.fs
            .write_file_atomic(&path, Bytes::from(data))
            .await
            .map_err(|e| SyncError::local_io(path, e))
    }

    /// Fetch the remote mirror. Any failure along the way yields an empty
    /// index; the mirror folder is never created on the read path.
    pub async fn fetch_remote(&self) -> CacheIndex {
        match self.try_fetch_remote().await {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "could not fetch remote cache mirror");
                CacheIndex::new()
            }
        }
    }

    async fn try_fetch_remote(&self) -> Result<CacheIndex> {
        let Some(folder_id) = self
            .store
            .find_folder(&self.settings.cache_folder_name, None)
            .await?
        else {
            debug!("no remote cache folder yet");
            return Ok(CacheIndex::new());
        };
        let Some(node) = self
            .store
            .find_file(&self.settings.cache_file_name, &folder_id)
            .await?
        else {
            debug!("remote cache folder exists but holds no cache document");
            return Ok(CacheIndex::new());
        };
        let data = self.store.download_file(&node.id, None).await?;
        Ok(CacheIndex::decode_lossy(&data))
    }

    /// Upload the cache document to the remote mirror, creating the mirror
    /// folder on first use and replacing the document if it already exists.
    pub async fn store_remote(&self, index: &CacheIndex) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)
            .map_err(|e| SyncError::Cache(format!("cache index did not encode: {}", e)))?;

        let folder_id = match self
            .store
            .find_folder(&self.settings.cache_folder_name, None)
            .await?
        {
            Some(id) => id,
            None => {
                self.store
                    .create_folder(&self.settings.cache_folder_name, None)
                    .await?
            }
        };

        let existing = self
            .store
            .find_file(&self.settings.cache_file_name, &folder_id)
            .await?;
        match existing {
            Some(node) => {
                self.store
                    .update_file(&node.id, Bytes::from(data), None)
                    .await?;
            }
            None => {
                self.store
                    .upload_file(
                        &self.settings.cache_file_name,
                        &folder_id,
                        Bytes::from(data),
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Build the starting index for a run: the remote mirror merged over the
    /// local replica, the mirror's entries winning ties.
    pub async fn initialize(&self) -> CacheIndex {
        let local = self.load_local().await;
        if !self.settings.mirror_cache_remotely {
            return local;
        }
        let remote = self.fetch_remote().await;
        debug!(
            local_folders = local.folder_count(),
            local_files = local.file_count(),
            remote_folders = remote.folder_count(),
            remote_files = remote.file_count(),
            "merging cache replicas"
        );
        remote.merge(local)
    }

    /// Persist the index after a run: the local write must succeed, the
    /// remote mirror is best-effort.
    pub async fn save(&self, index: &CacheIndex) -> Result<()> {
        self.save_local(index).await?;
        if self.settings.mirror_cache_remotely {
            if let Err(e) = self.store_remote(index).await {
                warn!(error = %e, "remote cache mirror not updated");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("local_path", &self.local_path())
            .field("mirror_cache_remotely", &self.settings.mirror_cache_remotely)
            .finish()
    }
}
