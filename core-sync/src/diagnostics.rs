//! # Diagnostics
//!
//! Read-only comparison of the three replicas, session by session, plus the
//! recovery path: rebuilding the cache index from a fresh remote enumeration
//! when hints have drifted from reality.
//!
//! A session counts as present remotely only if its folder holds the record
//! file; an empty session folder shows up as a discrepancy, not as a synced
//! session.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

use bridge_traits::storage::ObjectStore;
use core_runtime::config::SyncSettings;
use tracing::{info, instrument, warn};

use crate::cache_index::{CacheIndex, FileKey, FolderKey};
use crate::error::Result;
use crate::local_store::SessionStore;
use crate::resolver::RemoteResolver;
use crate::session::SessionId;

/// Where one session was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionPresence {
    pub in_remote: bool,
    pub in_local: bool,
    pub in_cache: bool,
}

impl SessionPresence {
    /// All three replicas agree the session exists.
    pub fn is_consistent(&self) -> bool {
        self.in_remote && self.in_local && self.in_cache
    }

    /// Human-readable list of the replicas missing this session.
    pub fn issue(&self) -> String {
        let mut missing = Vec::new();
        if !self.in_remote {
            missing.push("remote");
        }
        if !self.in_local {
            missing.push("local");
        }
        if !self.in_cache {
            missing.push("cache");
        }
        if missing.is_empty() {
            String::new()
        } else {
            format!("missing from {}", missing.join(", "))
        }
    }
}

/// One session's row in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsRow {
    pub session: SessionId,
    pub presence: SessionPresence,
}

/// Full three-way comparison, ascending by session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub rows: Vec<DiagnosticsRow>,
    pub remote_total: usize,
    pub local_total: usize,
    pub cache_total: usize,
}

impl DiagnosticsReport {
    /// Rows where at least one replica disagrees.
    pub fn discrepancies(&self) -> Vec<&DiagnosticsRow> {
        self.rows
            .iter()
            .filter(|row| !row.presence.is_consistent())
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.rows.iter().all(|row| row.presence.is_consistent())
    }

    /// Render a fixed-width text table with per-replica check marks.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<17} {:^6} {:^5} {:^5}  {}",
            "Session", "Remote", "Local", "Cache", "Issues"
        );
        let _ = writeln!(out, "{}", "-".repeat(60));
        for row in &self.rows {
            let mark = |present: bool| if present { "\u{2713}" } else { "\u{2717}" };
            let _ = writeln!(
                out,
                "{:<17} {:^6} {:^5} {:^5}  {}",
                row.session,
                mark(row.presence.in_remote),
                mark(row.presence.in_local),
                mark(row.presence.in_cache),
                row.presence.issue()
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(60));
        let _ = writeln!(
            out,
            "totals: {} remote, {} local, {} cached, {} discrepancies",
            self.remote_total,
            self.local_total,
            self.cache_total,
            self.discrepancies().len()
        );
        out
    }
}

pub struct DiagnosticsReporter {
    store: Arc<dyn ObjectStore>,
    sessions: SessionStore,
    resolver: RemoteResolver,
    settings: SyncSettings,
}

impl DiagnosticsReporter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        sessions: SessionStore,
        resolver: RemoteResolver,
        settings: &SyncSettings,
    ) -> Self {
        DiagnosticsReporter {
            store,
            sessions,
            resolver,
            settings: settings.clone(),
        }
    }

    /// Compare the three replicas without mutating any of them.
    ///
    /// The cache is consulted read-only; remote presence comes from a live
    /// enumeration, not from hints.
    #[instrument(skip_all)]
    pub async fn report(&self, cache: &CacheIndex) -> Result<DiagnosticsReport> {
        let root_id = self.find_root(cache).await?;

        let mut remote_sessions = BTreeSet::new();
        if let Some(root_id) = root_id.as_deref() {
            for (session, folder_id) in self
                .resolver
                .enumerate_session_folders(
                    root_id,
                    self.settings.page_size,
                    self.settings.max_list_pages,
                )
                .await?
            {
                let has_record = self
                    .store
                    .find_file(&self.settings.record_name, &folder_id)
                    .await?
                    .is_some();
                if has_record {
                    remote_sessions.insert(session);
                } else {
                    warn!(session = %session, "remote session folder holds no record");
                }
            }
        }

        let local_sessions: BTreeSet<SessionId> =
            self.sessions.list_sessions().await?.into_iter().collect();

        let cache_sessions: BTreeSet<SessionId> = match root_id.as_deref() {
            Some(root_id) => cache.sessions_under(root_id),
            None => BTreeSet::new(),
        };

        let mut rows: BTreeMap<SessionId, SessionPresence> = BTreeMap::new();
        for session in &remote_sessions {
            rows.entry(session.clone()).or_default().in_remote = true;
        }
        for session in &local_sessions {
            rows.entry(session.clone()).or_default().in_local = true;
        }
        for session in &cache_sessions {
            rows.entry(session.clone()).or_default().in_cache = true;
        }

        let report = DiagnosticsReport {
            rows: rows
                .into_iter()
                .map(|(session, presence)| DiagnosticsRow { session, presence })
                .collect(),
            remote_total: remote_sessions.len(),
            local_total: local_sessions.len(),
            cache_total: cache_sessions.len(),
        };
        info!(
            remote = report.remote_total,
            local = report.local_total,
            cached = report.cache_total,
            discrepancies = report.discrepancies().len(),
            "diagnostics complete"
        );
        Ok(report)
    }

    /// Rebuild the cache index from a fresh remote enumeration.
    ///
    /// The result reflects only what the remote confirms right now: the root
    /// folder, every session folder under it, and every record file found.
    /// An absent root yields an empty index.
    #[instrument(skip_all)]
    pub async fn rebuild_cache(&self) -> Result<CacheIndex> {
        let mut index = CacheIndex::new();

        let Some(root_id) = self
            .store
            .find_folder(&self.settings.remote_root, None)
            .await?
        else {
            info!(folder = %self.settings.remote_root, "no remote root; rebuilt cache is empty");
            return Ok(index);
        };
        index.record_folder(FolderKey::root(&self.settings.remote_root), root_id.clone());

        let remote_sessions = self
            .resolver
            .enumerate_session_folders(
                &root_id,
                self.settings.page_size,
                self.settings.max_list_pages,
            )
            .await?;

        for (session, folder_id) in remote_sessions {
            index.record_folder(
                FolderKey::under(&root_id, session.as_str()),
                folder_id.clone(),
            );
            if let Some(node) = self
                .store
                .find_file(&self.settings.record_name, &folder_id)
                .await?
            {
                let modified_at = self.resolver.node_timestamp(node.modified_at);
                index.record_file(
                    FileKey::new(&folder_id, &self.settings.record_name),
                    node.id,
                    modified_at,
                );
            }
        }

        info!(
            folders = index.folder_count(),
            files = index.file_count(),
            "cache rebuilt from remote enumeration"
        );
        Ok(index)
    }

    /// Resolve the root folder id without recording anything in the cache.
    async fn find_root(&self, cache: &CacheIndex) -> Result<Option<String>> {
        if let Some(id) = cache.lookup_folder(&FolderKey::root(&self.settings.remote_root)) {
            return Ok(Some(id.to_string()));
        }
        Ok(self
            .store
            .find_folder(&self.settings.remote_root, None)
            .await?)
    }
}

impl std::fmt::Debug for DiagnosticsReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsReporter")
            .field("sessions", &self.sessions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(r: bool, l: bool, c: bool) -> SessionPresence {
        SessionPresence {
            in_remote: r,
            in_local: l,
            in_cache: c,
        }
    }

    #[test]
    fn test_presence_classification() {
        assert!(presence(true, true, true).is_consistent());
        assert!(!presence(true, false, true).is_consistent());
        assert_eq!(presence(true, true, true).issue(), "");
        assert_eq!(presence(false, true, false).issue(), "missing from remote, cache");
        assert_eq!(presence(true, false, true).issue(), "missing from local");
    }

    #[test]
    fn test_render_marks_rows() {
        let report = DiagnosticsReport {
            rows: vec![
                DiagnosticsRow {
                    session: SessionId::parse("20241126_100200").unwrap(),
                    presence: presence(true, true, true),
                },
                DiagnosticsRow {
                    session: SessionId::parse("20241127_090000").unwrap(),
                    presence: presence(false, true, false),
                },
            ],
            remote_total: 1,
            local_total: 2,
            cache_total: 1,
        };

        let rendered = report.render();
        assert!(rendered.contains("20241126_100200"));
        assert!(rendered.contains("\u{2713}"));
        assert!(rendered.contains("\u{2717}"));
        assert!(rendered.contains("missing from remote, cache"));
        assert!(rendered.contains("1 discrepancies"));
    }
}
