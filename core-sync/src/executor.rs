//! # Sync Executor
//!
//! Applies a plan sequentially and aggregates the outcome. Three rules give
//! the engine its safety properties:
//!
//! 1. **Re-check before mutating.** Every creating operation asks the remote
//!    whether the object already exists, bypassing the cache, so running the
//!    same plan twice (or racing a previous partial run) never duplicates
//!    anything.
//! 2. **Record only confirmed facts.** The cache index is updated strictly
//!    after the remote acknowledges an operation.
//! 3. **Fail soft, abort on fatal.** A transient failure is counted and the
//!    run continues; an auth-class failure aborts with a partial report,
//!    since every remaining operation would fail the same way.

use std::sync::Arc;

use bridge_traits::storage::{ObjectStore, ProgressFn, StoreError, TransferProgress};
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::cache_index::{CacheIndex, FileKey, FolderKey, ParentRef};
use crate::error::{Result, SyncError};
use crate::local_store::SessionStore;
use crate::planner::{SyncOperation, SyncPlan};
use crate::resolver::RemoteResolver;
use crate::session::SessionId;
use core_runtime::config::SyncSettings;

/// Identifier tying together the log lines of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncRunId(Uuid);

impl SyncRunId {
    pub fn new() -> Self {
        SyncRunId(Uuid::new_v4())
    }
}

impl Default for SyncRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Outcome counts for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: SyncRunId,
    /// Operations taken off the plan
    pub attempted: u32,
    /// Operations that mutated a replica
    pub succeeded: u32,
    /// Operations found already done at execution time
    pub skipped: u32,
    /// Operations that failed transiently (or were cut off by an abort)
    pub failed: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn begin(run_id: SyncRunId, now: DateTime<Utc>) -> Self {
        SyncReport {
            run_id,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            started_at: now,
            finished_at: now,
        }
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "run {}: {} attempted, {} applied, {} already in place, {} failed",
            self.run_id, self.attempted, self.succeeded, self.skipped, self.failed
        )
    }
}

enum OpOutcome {
    /// The replica was mutated.
    Applied,
    /// The work was already done; nothing was mutated.
    AlreadyDone,
}

pub struct SyncExecutor {
    store: Arc<dyn ObjectStore>,
    sessions: SessionStore,
    resolver: RemoteResolver,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
}

impl SyncExecutor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sessions: SessionStore,
        resolver: RemoteResolver,
        clock: Arc<dyn Clock>,
        settings: &SyncSettings,
    ) -> Self {
        SyncExecutor {
            store,
            sessions,
            resolver,
            clock,
            settings: settings.clone(),
        }
    }

    /// Run the plan to completion or to the first fatal error.
    ///
    /// On a fatal error the partial report travels inside
    /// [`SyncError::Aborted`]; the caller is expected to persist the cache
    /// either way, so successes before the abort are not re-queried later.
    #[instrument(skip_all, fields(run_id = %run_id, operations = plan.len()))]
    pub async fn execute_as(
        &self,
        run_id: SyncRunId,
        plan: &SyncPlan,
        cache: &mut CacheIndex,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::begin(run_id, self.clock.now());
        let mut root_id: Option<String> = None;

        for op in &plan.operations {
            report.attempted += 1;
            match self.apply(op, cache, &mut root_id).await {
                Ok(OpOutcome::Applied) => report.succeeded += 1,
                Ok(OpOutcome::AlreadyDone) => report.skipped += 1,
                Err(SyncError::Store(e)) if e.is_fatal() => {
                    report.failed += 1;
                    report.finished_at = self.clock.now();
                    error!(session = %op.session(), error = %e, "fatal store error; aborting run");
                    return Err(SyncError::Aborted {
                        reason: e.to_string(),
                        partial: Box::new(report),
                    });
                }
                Err(e) => {
                    warn!(session = %op.session(), error = %e, "operation failed; continuing");
                    report.failed += 1;
                }
            }
        }

        report.finished_at = self.clock.now();
        info!("{}", report.summary());
        Ok(report)
    }

    pub async fn execute(&self, plan: &SyncPlan, cache: &mut CacheIndex) -> Result<SyncReport> {
        self.execute_as(SyncRunId::new(), plan, cache).await
    }

    async fn apply(
        &self,
        op: &SyncOperation,
        cache: &mut CacheIndex,
        root_id: &mut Option<String>,
    ) -> Result<OpOutcome> {
        match op {
            SyncOperation::EnsureRemoteFolder { session } => {
                self.ensure_remote_folder(session, cache, root_id).await
            }
            SyncOperation::UploadRecord { session } => {
                self.upload_record(session, cache, root_id).await
            }
            SyncOperation::DownloadRecord { session, folder_id } => {
                self.download_record(session, folder_id, cache).await
            }
        }
    }

    /// Resolve or create the remote root folder, once per run.
    async fn ensure_root(
        &self,
        cache: &mut CacheIndex,
        root_id: &mut Option<String>,
    ) -> Result<String> {
        if let Some(id) = root_id {
            return Ok(id.clone());
        }
        let id = match self
            .resolver
            .resolve_folder(cache, &ParentRef::Root, &self.settings.remote_root)
            .await?
        {
            Some(id) => id,
            None => {
                info!(folder = %self.settings.remote_root, "creating remote root folder");
                let id = self
                    .store
                    .create_folder(&self.settings.remote_root, None)
                    .await?;
                cache.record_folder(FolderKey::root(&self.settings.remote_root), id.clone());
                id
            }
        };
        *root_id = Some(id.clone());
        Ok(id)
    }

    async fn ensure_remote_folder(
        &self,
        session: &SessionId,
        cache: &mut CacheIndex,
        root_id: &mut Option<String>,
    ) -> Result<OpOutcome> {
        let root = self.ensure_root(cache, root_id).await?;
        let key = FolderKey::under(&root, session.as_str());

        // The plan may be stale; ask the remote directly before creating.
        if let Some(id) = self
            .store
            .find_folder(session.as_str(), Some(root.as_str()))
            .await?
        {
            debug!(session = %session, id, "remote folder already present");
            cache.record_folder(key, id);
            return Ok(OpOutcome::AlreadyDone);
        }

        let id = self
            .store
            .create_folder(session.as_str(), Some(root.as_str()))
            .await?;
        info!(session = %session, id, "remote session folder created");
        cache.record_folder(key, id);
        Ok(OpOutcome::Applied)
    }

    async fn upload_record(
        &self,
        session: &SessionId,
        cache: &mut CacheIndex,
        root_id: &mut Option<String>,
    ) -> Result<OpOutcome> {
        let root = self.ensure_root(cache, root_id).await?;
        let folder_id = self
            .resolver
            .resolve_folder(cache, &ParentRef::Folder(root), session.as_str())
            .await?
            .ok_or_else(|| {
                // The preceding EnsureRemoteFolder must have failed; this
                // operation fails the same way and heals on the next run.
                SyncError::Store(StoreError::NotFound(format!(
                    "remote folder for session {}",
                    session
                )))
            })?;

        // Re-check against the remote itself, not the cache.
        if let Some(node) = self
            .store
            .find_file(&self.settings.record_name, &folder_id)
            .await?
        {
            debug!(session = %session, id = %node.id, "record already uploaded");
            let modified_at = self.resolver.node_timestamp(node.modified_at);
            cache.record_file(
                FileKey::new(&folder_id, &self.settings.record_name),
                node.id,
                modified_at,
            );
            return Ok(OpOutcome::AlreadyDone);
        }

        let data = self.sessions.read_record(session).await?;
        let total = data.len();
        let node = self
            .store
            .upload_file(
                &self.settings.record_name,
                &folder_id,
                data,
                Some(transfer_logger("upload", session)),
            )
            .await?;
        info!(session = %session, id = %node.id, bytes = total, "record uploaded");

        let modified_at = self.resolver.node_timestamp(node.modified_at);
        cache.record_file(
            FileKey::new(&folder_id, &self.settings.record_name),
            node.id,
            modified_at,
        );
        Ok(OpOutcome::Applied)
    }

    async fn download_record(
        &self,
        session: &SessionId,
        folder_id: &str,
        cache: &mut CacheIndex,
    ) -> Result<OpOutcome> {
        // Another process (or an earlier op) may have written it meanwhile.
        if self.sessions.record_exists(session).await? {
            debug!(session = %session, "record already present locally");
            return Ok(OpOutcome::AlreadyDone);
        }

        let Some(node) = self
            .store
            .find_file(&self.settings.record_name, folder_id)
            .await?
        else {
            // A session folder without a record: nothing to transfer.
            warn!(session = %session, "remote session folder holds no record");
            return Ok(OpOutcome::AlreadyDone);
        };

        let data = self
            .store
            .download_file(&node.id, Some(transfer_logger("download", session)))
            .await?;
        let total = data.len();
        self.sessions.write_record(session, data).await?;
        info!(session = %session, id = %node.id, bytes = total, "record downloaded");

        let modified_at = self.resolver.node_timestamp(node.modified_at);
        cache.record_file(
            FileKey::new(folder_id, &self.settings.record_name),
            node.id,
            modified_at,
        );
        Ok(OpOutcome::Applied)
    }
}

fn transfer_logger(direction: &'static str, session: &SessionId) -> ProgressFn {
    let session = session.to_string();
    Arc::new(move |p: TransferProgress| {
        debug!(
            session = %session,
            direction,
            bytes = p.bytes_transferred,
            total = ?p.total_bytes,
            "transfer progress"
        );
    })
}

impl std::fmt::Debug for SyncExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncExecutor")
            .field("sessions", &self.sessions)
            .finish()
    }
}
