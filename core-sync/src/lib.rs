//! # Replica Synchronization Engine
//!
//! Keeps three records of a growing set of immutable session logs in
//! agreement: a local directory tree, a persisted cache index, and a remote
//! hierarchical object store.
//!
//! ## Components
//!
//! - **Session identity** (`session`): sortable, timestamp-derived session IDs
//! - **Local Store** (`local_store`): enumerate sessions on disk, read/write record files
//! - **Cache Index** (`cache_index`): typed composite-key mappings to remote IDs
//! - **Cache Store** (`cache_store`): atomic local persistence plus the remote mirror
//! - **Remote Resolver** (`resolver`): cache-then-remote lookups with opportunistic population
//! - **Sync Planner** (`planner`): diffs the three replicas into an ordered operation list
//! - **Sync Executor** (`executor`): applies operations idempotently, aggregating outcome counts
//! - **Diagnostics** (`diagnostics`): three-way presence report and cache rebuild from ground truth
//! - **Coordinator** (`coordinator`): façade wiring the pieces to a validated configuration
//!
//! ## Consistency model
//!
//! Single writer per run; eventual consistency; the remote store is
//! authoritative when replicas disagree. Cache entries are hints: a stale
//! positive is tolerated and resolved by the executor's pre-mutation
//! re-checks or, after out-of-band changes, by rebuilding the cache from a
//! fresh remote enumeration.

pub mod cache_index;
pub mod cache_store;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod local_store;
pub mod planner;
pub mod resolver;
pub mod session;

pub use cache_index::{CacheIndex, FileEntry, FileKey, FolderKey, ParentRef};
pub use cache_store::CacheStore;
pub use coordinator::SyncCoordinator;
pub use diagnostics::{DiagnosticsReport, DiagnosticsReporter, DiagnosticsRow, SessionPresence};
pub use error::{Result, SyncError};
pub use executor::{SyncExecutor, SyncReport, SyncRunId};
pub use local_store::SessionStore;
pub use planner::{SyncDirection, SyncOperation, SyncPlan, SyncPlanner};
pub use resolver::RemoteResolver;
pub use session::SessionId;
