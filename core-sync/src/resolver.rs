//! # Remote Resolver
//!
//! Cache-then-remote lookups. Every resolution consults the cache index
//! first and falls through to a remote query on a miss, recording what the
//! remote confirms so the next run hits the cache. Resolution never creates
//! anything; creation is the executor's job.

use std::sync::Arc;

use bridge_traits::storage::{NodeKind, ObjectStore};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::cache_index::{CacheIndex, FileEntry, FileKey, FolderKey, ParentRef};
use crate::error::{Result, SyncError};
use crate::session::SessionId;

#[derive(Clone)]
pub struct RemoteResolver {
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
}

impl RemoteResolver {
    pub fn new(store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>) -> Self {
        RemoteResolver { store, clock }
    }

    /// Resolve a folder id, cache first.
    ///
    /// `Ok(None)` means the folder does not exist remotely (as far as this
    /// run can tell); a cached id is returned without a remote round trip.
    pub async fn resolve_folder(
        &self,
        cache: &mut CacheIndex,
        parent: &ParentRef,
        name: &str,
    ) -> Result<Option<String>> {
        let key = FolderKey {
            parent: parent.clone(),
            name: name.to_string(),
        };
        if let Some(id) = cache.lookup_folder(&key) {
            trace!(folder = name, id, "folder resolved from cache");
            return Ok(Some(id.to_string()));
        }

        let parent_id = match parent {
            ParentRef::Root => None,
            ParentRef::Folder(id) => Some(id.as_str()),
        };
        match self.store.find_folder(name, parent_id).await? {
            Some(id) => {
                debug!(folder = name, id, "folder resolved remotely");
                cache.record_folder(key, id.clone());
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    /// Resolve a file entry, cache first.
    pub async fn resolve_file(
        &self,
        cache: &mut CacheIndex,
        folder_id: &str,
        name: &str,
    ) -> Result<Option<FileEntry>> {
        let key = FileKey::new(folder_id, name);
        if let Some(entry) = cache.lookup_file(&key) {
            trace!(file = name, id = %entry.id, "file resolved from cache");
            return Ok(Some(entry.clone()));
        }

        match self.store.find_file(name, folder_id).await? {
            Some(node) => {
                debug!(file = name, id = %node.id, "file resolved remotely");
                let modified_at = self.node_timestamp(node.modified_at);
                cache.record_file(key.clone(), node.id.clone(), modified_at);
                Ok(cache.lookup_file(&key).cloned())
            }
            None => Ok(None),
        }
    }

    /// Enumerate the session folders under `root_id` by walking the remote's
    /// paginated listing, skipping folders whose name is not a session id.
    ///
    /// Refuses to run past `max_pages` pages rather than loop on a remote
    /// that keeps handing out cursors.
    pub async fn enumerate_session_folders(
        &self,
        root_id: &str,
        page_size: u32,
        max_pages: u32,
    ) -> Result<Vec<(SessionId, String)>> {
        let mut sessions = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            if pages >= max_pages {
                return Err(SyncError::ListingTruncated { max_pages });
            }
            let page = self
                .store
                .list_children(root_id, NodeKind::Folder, cursor, page_size)
                .await?;
            pages += 1;

            for node in page.nodes {
                match SessionId::parse(&node.name) {
                    Ok(session) => sessions.push((session, node.id)),
                    Err(_) => {
                        debug!(folder = %node.name, "skipping non-session remote folder");
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        sessions.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(sessions)
    }

    /// Remote timestamps are preferred; absent ones fall back to the clock
    /// so cache entries always carry a merge-comparable time.
    pub fn node_timestamp(&self, remote: Option<DateTime<Utc>>) -> DateTime<Utc> {
        remote.unwrap_or_else(|| self.clock.now())
    }
}

impl std::fmt::Debug for RemoteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResolver").finish()
    }
}
