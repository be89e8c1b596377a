use std::path::PathBuf;

use bridge_traits::storage::StoreError;
use bridge_traits::BridgeError;
use thiserror::Error;

use crate::executor::SyncReport;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Local disk I/O failed for a specific path.
    #[error("local I/O failed at {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: BridgeError,
    },

    /// The remote store rejected or failed an operation.
    #[error("remote store error: {0}")]
    Store(#[from] StoreError),

    /// The cache index could not be persisted or encoded.
    #[error("cache persistence failed: {0}")]
    Cache(String),

    /// A remote enumeration kept returning continuation cursors past the
    /// configured page cap.
    #[error("remote listing exceeded {max_pages} pages; refusing to continue")]
    ListingTruncated { max_pages: u32 },

    /// A fatal store error stopped the run mid-plan. The partial report
    /// covers the operations attempted before the abort.
    #[error("sync run aborted: {reason}")]
    Aborted {
        reason: String,
        partial: Box<SyncReport>,
    },

    /// A string did not parse as a session identifier.
    #[error("invalid session id {0:?}")]
    InvalidSessionId(String),
}

impl SyncError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: BridgeError) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
