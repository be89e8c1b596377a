//! # Sync Coordinator
//!
//! Façade over the engine: owns the in-memory cache index for the lifetime
//! of the coordinator and wires the planner, executor, diagnostics and cache
//! persistence to one validated [`CoreConfig`].
//!
//! The cache is persisted at the end of every sync call, including aborted
//! runs, so IDs discovered before a failure are not re-queried next time.

use core_runtime::config::CoreConfig;
use tracing::{info, instrument, warn};

use crate::cache_index::CacheIndex;
use crate::cache_store::CacheStore;
use crate::diagnostics::{DiagnosticsReport, DiagnosticsReporter};
use crate::error::Result;
use crate::executor::{SyncExecutor, SyncReport};
use crate::local_store::SessionStore;
use crate::planner::{SyncDirection, SyncPlanner};
use crate::resolver::RemoteResolver;

pub struct SyncCoordinator {
    config: CoreConfig,
    cache: CacheIndex,
}

impl SyncCoordinator {
    /// Wrap a validated configuration. The cache starts empty; call
    /// [`initialize`](Self::initialize) to warm it from the persisted
    /// replicas.
    pub fn new(config: CoreConfig) -> Self {
        SyncCoordinator {
            config,
            cache: CacheIndex::new(),
        }
    }

    fn session_store(&self) -> SessionStore {
        SessionStore::new(self.config.file_system.clone(), &self.config.settings)
    }

    fn cache_store(&self) -> CacheStore {
        CacheStore::new(
            self.config.file_system.clone(),
            self.config.object_store.clone(),
            &self.config.settings,
        )
    }

    fn resolver(&self) -> RemoteResolver {
        RemoteResolver::new(self.config.object_store.clone(), self.config.clock.clone())
    }

    fn planner(&self) -> SyncPlanner {
        SyncPlanner::new(self.session_store(), self.resolver(), &self.config.settings)
    }

    fn executor(&self) -> SyncExecutor {
        SyncExecutor::new(
            self.config.object_store.clone(),
            self.session_store(),
            self.resolver(),
            self.config.clock.clone(),
            &self.config.settings,
        )
    }

    fn reporter(&self) -> DiagnosticsReporter {
        DiagnosticsReporter::new(
            self.config.object_store.clone(),
            self.session_store(),
            self.resolver(),
            &self.config.settings,
        )
    }

    /// Load and merge the persisted cache replicas into the working index.
    #[instrument(skip_all)]
    pub async fn initialize(&mut self) {
        self.cache = self.cache_store().initialize().await;
        info!(
            folders = self.cache.folder_count(),
            files = self.cache.file_count(),
            "cache initialized"
        );
    }

    /// Plan and execute one sync run, then persist the cache.
    ///
    /// The cache is saved even when the run aborts; a save failure after a
    /// successful run surfaces as the call's error, while a save failure
    /// after a failed run is logged and the run's error wins.
    #[instrument(skip(self), fields(direction = ?direction))]
    pub async fn sync(&mut self, direction: SyncDirection) -> Result<SyncReport> {
        let plan = self.planner().plan(direction, &mut self.cache).await?;
        let outcome = self.executor().execute(&plan, &mut self.cache).await;

        let save_outcome = self.cache_store().save(&self.cache).await;
        match (outcome, save_outcome) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(save_err)) => Err(save_err),
            (Err(run_err), Ok(())) => Err(run_err),
            (Err(run_err), Err(save_err)) => {
                warn!(error = %save_err, "cache not persisted after failed run");
                Err(run_err)
            }
        }
    }

    /// Compare the three replicas without mutating anything.
    pub async fn diagnose(&self) -> Result<DiagnosticsReport> {
        self.reporter().report(&self.cache).await
    }

    /// Replace the cache with a fresh remote enumeration and persist it.
    ///
    /// Returns the number of file entries in the rebuilt index.
    #[instrument(skip_all)]
    pub async fn rebuild_cache(&mut self) -> Result<usize> {
        self.cache = self.reporter().rebuild_cache().await?;
        self.cache_store().save(&self.cache).await?;
        Ok(self.cache.file_count())
    }

    /// The current working cache index.
    pub fn cache(&self) -> &CacheIndex {
        &self.cache
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("config", &self.config)
            .field(
                "cache",
                &format_args!(
                    "{} folders, {} files",
                    self.cache.folder_count(),
                    self.cache.file_count()
                ),
            )
            .finish()
    }
}
