use core_sync::{SessionId, SyncError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    /// Reading or writing a record through the session store failed.
    #[error("session store error: {0}")]
    Store(#[from] SyncError),

    /// A record file exists but its JSON did not parse.
    #[error("record for session {session} did not parse: {source}")]
    Malformed {
        session: SessionId,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded to JSON.
    #[error("record encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A session range with end before start.
    #[error("invalid session range: {0}")]
    InvalidRange(String),
}

pub type Result<T> = std::result::Result<T, RecordError>;
