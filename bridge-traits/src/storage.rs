//! Storage Abstractions
//!
//! Two capabilities live here: local file I/O (`FileSystemAccess`) and the
//! remote hierarchical object store (`ObjectStore`). The engine owns neither;
//! it reads and writes through these traits and treats the remote store as
//! ground truth when the replicas disagree.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts local disk I/O so the engine can run against a scratch directory
/// in tests and a host-provided directory in production.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save_record(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     fs.write_file(Path::new("logs/20241126_100200/session_log.json"), data.into()).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it and missing parent directories
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Atomically replace the file at `path` with `data`.
    ///
    /// Writes to a temporary sibling first and renames it into place, so a
    /// reader never observes a half-written file. A crash between the write
    /// and the rename leaves the previous content intact.
    async fn write_file_atomic(&self, path: &Path, data: Bytes) -> Result<()> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        self.write_file(&tmp, data).await?;
        match self.rename(&tmp, path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.delete_file(&tmp).await;
                Err(e)
            }
        }
    }
}

/// Remote object store error taxonomy.
///
/// The executor's partial-failure policy hangs off [`StoreError::is_fatal`]:
/// fatal errors abort the run, everything else is counted and skipped.
/// Expected absence is never an error; `find_*` operations return `Ok(None)`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Credentials rejected. Fatal: every subsequent call would fail too.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The token is valid but lacks access. Fatal for the same reason.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An id-addressed object is gone. A stale cache hint, not fatal.
    #[error("remote object not found: {0}")]
    NotFound(String),

    /// Rate limited; the operation may succeed later.
    #[error("rate limited (status {status})")]
    RateLimited { status: u16 },

    /// Any other API-level failure.
    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure before a status code was obtained.
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered but the payload did not parse.
    #[error("malformed remote response: {0}")]
    Malformed(String),
}

impl StoreError {
    /// True when continuing the run cannot succeed (auth/permission).
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Auth(_) | StoreError::PermissionDenied(_))
    }

    /// True when the operation is worth retrying on a later run.
    pub fn is_transient(&self) -> bool {
        !self.is_fatal()
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Kind of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// A folder or file node in the remote store
#[derive(Debug, Clone)]
pub struct RemoteNode {
    /// Store-assigned identifier
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    /// Size in bytes; folders have none
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
    pub md5_checksum: Option<String>,
}

impl RemoteNode {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct NodePage {
    pub nodes: Vec<RemoteNode>,
    /// Opaque continuation token; `None` means the listing is exhausted
    pub next_cursor: Option<String>,
}

/// Incremental transfer progress, reported after each chunk
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: Option<u64>,
}

/// Progress callback for chunked transfers.
///
/// Observability only: implementations must never use it for control flow.
pub type ProgressFn = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Hierarchical object store trait
///
/// The remote replica: folder/file CRUD, paginated listing, and chunked
/// resumable transfer. The connector receives an already-authenticated
/// `HttpClient`; nothing here acquires credentials.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::ObjectStore;
///
/// async fn root_folder(store: &dyn ObjectStore) -> StoreResult<String> {
///     match store.find_folder("SessionLogs", None).await? {
///         Some(id) => Ok(id),
///         None => store.create_folder("SessionLogs", None).await,
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Find a folder by name under `parent_id` (or anywhere when `None`).
    ///
    /// Absence is `Ok(None)`.
    async fn find_folder(&self, name: &str, parent_id: Option<&str>) -> StoreResult<Option<String>>;

    /// Find a file by name directly under `parent_id`. Absence is `Ok(None)`.
    async fn find_file(&self, name: &str, parent_id: &str) -> StoreResult<Option<RemoteNode>>;

    /// List one page of children of `parent_id`, filtered to `kind`.
    ///
    /// Callers loop on `next_cursor` until it is `None`.
    async fn list_children(
        &self,
        parent_id: &str,
        kind: NodeKind,
        cursor: Option<String>,
        page_size: u32,
    ) -> StoreResult<NodePage>;

    /// Create a folder and return its store-assigned id.
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> StoreResult<String>;

    /// Upload a new file via chunked resumable transfer.
    ///
    /// `progress` is invoked after each chunk.
    async fn upload_file(
        &self,
        name: &str,
        parent_id: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> StoreResult<RemoteNode>;

    /// Replace the content of an existing file, same chunking contract.
    async fn update_file(
        &self,
        file_id: &str,
        data: Bytes,
        progress: Option<ProgressFn>,
    ) -> StoreResult<RemoteNode>;

    /// Download a file via ranged chunked transfer.
    async fn download_file(&self, file_id: &str, progress: Option<ProgressFn>)
        -> StoreResult<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StoreError::Auth("expired".into()).is_fatal());
        assert!(StoreError::PermissionDenied("scope".into()).is_fatal());
        assert!(!StoreError::RateLimited { status: 429 }.is_fatal());
        assert!(!StoreError::NotFound("abc".into()).is_fatal());
        assert!(StoreError::Network("reset".into()).is_transient());
    }

    #[test]
    fn test_remote_node_kind() {
        let node = RemoteNode {
            id: "f1".into(),
            name: "20241126_100200".into(),
            kind: NodeKind::Folder,
            size: None,
            modified_at: None,
            md5_checksum: None,
        };
        assert!(node.is_folder());
    }
}
