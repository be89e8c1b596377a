//! # Local Store
//!
//! The on-disk replica: one subdirectory per session under a base directory,
//! each holding a single record file with a well-known name. Records are
//! immutable once written; the store never rewrites an existing record.

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_runtime::config::SyncSettings;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::session::SessionId;

/// Read/write access to the local session tree.
#[derive(Clone)]
pub struct SessionStore {
    fs: Arc<dyn FileSystemAccess>,
    base_dir: PathBuf,
    record_name: String,
}

impl SessionStore {
    pub fn new(fs: Arc<dyn FileSystemAccess>, settings: &SyncSettings) -> Self {
        SessionStore {
            fs,
            base_dir: settings.base_dir.clone(),
            record_name: settings.record_name.clone(),
        }
    }

    /// Directory holding one session's files.
    pub fn session_dir(&self, session: &SessionId) -> PathBuf {
        self.base_dir.join(session.as_str())
    }

    /// Full path of a session's record file.
    pub fn record_path(&self, session: &SessionId) -> PathBuf {
        self.session_dir(session).join(&self.record_name)
    }

    /// Enumerate local sessions, ascending by id.
    ///
    /// Only directories whose name parses as a session id and which contain
    /// the record file count; everything else in the base directory is
    /// ignored. A missing base directory is an empty store, not an error.
    pub async fn list_sessions(&self) -> Result<Vec<SessionId>> {
        if !self
            .fs
            .exists(&self.base_dir)
            .await
            .map_err(|e| SyncError::local_io(&self.base_dir, e))?
        {
            return Ok(Vec::new());
        }

        let entries = self
            .fs
            .list_directory(&self.base_dir)
            .await
            .map_err(|e| SyncError::local_io(&self.base_dir, e))?;

        let mut sessions = Vec::new();
        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(session) = SessionId::parse(name) else {
                debug!(entry = name, "skipping non-session entry in base directory");
                continue;
            };
            if self.record_exists(&session).await? {
                sessions.push(session);
            }
        }
        sessions.sort();
        Ok(sessions)
    }

    /// Whether the session's record file exists locally.
    pub async fn record_exists(&self, session: &SessionId) -> Result<bool> {
        let path = self.record_path(session);
        self.fs
            .exists(&path)
            .await
            .map_err(|e| SyncError::local_io(path, e))
    }

    /// Read a session's record file.
    pub async fn read_record(&self, session: &SessionId) -> Result<Bytes> {
        let path = self.record_path(session);
        self.fs
            .read_file(&path)
            .await
            .map_err(|e| SyncError::local_io(path, e))
    }

    /// Write a session's record file, creating the session directory.
    pub async fn write_record(&self, session: &SessionId, data: Bytes) -> Result<()> {
        let dir = self.session_dir(session);
        self.fs
            .create_dir_all(&dir)
            .await
            .map_err(|e| SyncError::local_io(&dir, e))?;
        let path = self.record_path(session);
        self.fs
            .write_file(&path, data)
            .await
            .map_err(|e| SyncError::local_io(path, e))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("base_dir", &self.base_dir)
            .field("record_name", &self.record_name)
            .finish()
    }
}
