//! # Sync Planner
//!
//! Diffs the three replicas into an ordered list of operations. Planning is
//! read-only against local disk and the remote store; it mutates only the
//! in-memory cache index, and only by recording confirmed facts.
//!
//! Plan order is deterministic: uploads ascending by session id, then
//! downloads ascending by session id. Within a session, folder creation is
//! planned before the record upload.

use core_runtime::config::SyncSettings;
use tracing::{debug, info, instrument};

use crate::cache_index::{CacheIndex, ParentRef};
use crate::error::Result;
use crate::local_store::SessionStore;
use crate::resolver::RemoteResolver;
use crate::session::SessionId;

/// Which way a run moves records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local records missing remotely are uploaded.
    Push,
    /// Remote records missing locally are downloaded.
    Pull,
    /// Both, uploads first.
    Full,
}

impl SyncDirection {
    fn includes_push(self) -> bool {
        matches!(self, SyncDirection::Push | SyncDirection::Full)
    }

    fn includes_pull(self) -> bool {
        matches!(self, SyncDirection::Pull | SyncDirection::Full)
    }
}

/// One step of a sync plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    /// Create the session's remote folder if it still does not exist.
    EnsureRemoteFolder { session: SessionId },
    /// Upload the session's record into its remote folder.
    UploadRecord { session: SessionId },
    /// Download the session's record from its known remote folder.
    DownloadRecord {
        session: SessionId,
        folder_id: String,
    },
}

impl SyncOperation {
    pub fn session(&self) -> &SessionId {
        match self {
            SyncOperation::EnsureRemoteFolder { session }
            | SyncOperation::UploadRecord { session }
            | SyncOperation::DownloadRecord { session, .. } => session,
        }
    }
}

/// An ordered, deterministic operation list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub operations: Vec<SyncOperation>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

pub struct SyncPlanner {
    sessions: SessionStore,
    resolver: RemoteResolver,
    settings: SyncSettings,
}

impl SyncPlanner {
    pub fn new(sessions: SessionStore, resolver: RemoteResolver, settings: &SyncSettings) -> Self {
        SyncPlanner {
            sessions,
            resolver,
            settings: settings.clone(),
        }
    }

    /// Compute the plan for one run.
    #[instrument(skip(self, cache), fields(direction = ?direction))]
    pub async fn plan(
        &self,
        direction: SyncDirection,
        cache: &mut CacheIndex,
    ) -> Result<SyncPlan> {
        let root_id = self
            .resolver
            .resolve_folder(cache, &ParentRef::Root, &self.settings.remote_root)
            .await?;

        let mut uploads = Vec::new();
        let mut downloads = Vec::new();

        if direction.includes_push() {
            self.plan_uploads(cache, root_id.as_deref(), &mut uploads)
                .await?;
        }
        if direction.includes_pull() {
            if let Some(root_id) = root_id.as_deref() {
                self.plan_downloads(root_id, &mut downloads).await?;
            } else {
                debug!("no remote root folder; nothing to pull");
            }
        }

        let mut operations = uploads;
        operations.extend(downloads);
        info!(operations = operations.len(), "sync plan computed");
        Ok(SyncPlan { operations })
    }

    async fn plan_uploads(
        &self,
        cache: &mut CacheIndex,
        root_id: Option<&str>,
        out: &mut Vec<SyncOperation>,
    ) -> Result<()> {
        // list_sessions is already ascending; plan order follows it.
        for session in self.sessions.list_sessions().await? {
            let folder_id = match root_id {
                Some(root_id) => {
                    self.resolver
                        .resolve_folder(
                            cache,
                            &ParentRef::Folder(root_id.to_string()),
                            session.as_str(),
                        )
                        .await?
                }
                // No root folder yet: nothing under it can exist either.
                None => None,
            };

            match folder_id {
                None => {
                    debug!(session = %session, "pending upload (no remote folder)");
                    out.push(SyncOperation::EnsureRemoteFolder {
                        session: session.clone(),
                    });
                    out.push(SyncOperation::UploadRecord { session });
                }
                Some(folder_id) => {
                    let record = self
                        .resolver
                        .resolve_file(cache, &folder_id, &self.settings.record_name)
                        .await?;
                    if record.is_none() {
                        debug!(session = %session, "pending upload (folder without record)");
                        out.push(SyncOperation::UploadRecord { session });
                    }
                }
            }
        }
        Ok(())
    }

    async fn plan_downloads(
        &self,
        root_id: &str,
        out: &mut Vec<SyncOperation>,
    ) -> Result<()> {
        let remote_sessions = self
            .resolver
            .enumerate_session_folders(
                root_id,
                self.settings.page_size,
                self.settings.max_list_pages,
            )
            .await?;

        for (session, folder_id) in remote_sessions {
            if !self.sessions.record_exists(&session).await? {
                debug!(session = %session, "pending download");
                out.push(SyncOperation::DownloadRecord { session, folder_id });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SyncPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPlanner")
            .field("sessions", &self.sessions)
            .finish()
    }
}
