//! # Session Statistics
//!
//! Outcome and action tallies over the local session tree, grouped by
//! session kind and optionally restricted to an id range. Records that do
//! not read or parse are counted and skipped; one bad file never sinks the
//! whole summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use core_runtime::config::CoreConfig;
use core_sync::{SessionId, SessionStore};
use tracing::{instrument, warn};

use crate::error::{RecordError, Result};
use crate::model::{ActionKind, Outcome, SessionKind, SessionRecord};

/// Tallies for one session kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindTally {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub aborted: u32,
    pub moves: u32,
    pub switches: u32,
    pub fallback_moves: u32,
}

impl KindTally {
    pub fn total_actions(&self) -> u32 {
        self.moves + self.switches
    }

    pub fn fallback_percent(&self) -> f64 {
        if self.total_actions() == 0 {
            0.0
        } else {
            f64::from(self.fallback_moves) * 100.0 / f64::from(self.total_actions())
        }
    }

    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            0.0
        } else {
            f64::from(self.wins) * 100.0 / f64::from(decided)
        }
    }

    fn absorb(&mut self, record: &SessionRecord) {
        self.games += 1;
        match record.metadata.outcome {
            Some(Outcome::Win) => self.wins += 1,
            Some(Outcome::Loss) => self.losses += 1,
            Some(Outcome::Aborted) | None => self.aborted += 1,
        }
        for turn in &record.turns {
            match turn.action.kind {
                ActionKind::Move => self.moves += 1,
                ActionKind::Switch => self.switches += 1,
            }
            if turn.is_fallback {
                self.fallback_moves += 1;
            }
        }
    }
}

/// The aggregated result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSummary {
    pub per_kind: BTreeMap<SessionKind, KindTally>,
    /// Sessions whose records were read and parsed
    pub scanned: u32,
    /// Sessions skipped because their record did not read or parse
    pub unreadable: u32,
}

impl StatsSummary {
    /// Render a plain-text summary, one block per kind.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (kind, tally) in &self.per_kind {
            let _ = writeln!(out, "{}:", kind);
            let _ = writeln!(
                out,
                "  {} games ({} won, {} lost, {} aborted, {:.1}% win rate)",
                tally.games,
                tally.wins,
                tally.losses,
                tally.aborted,
                tally.win_rate()
            );
            let _ = writeln!(
                out,
                "  {} moves, {} switches, {} fallbacks ({:.1}%)",
                tally.moves,
                tally.switches,
                tally.fallback_moves,
                tally.fallback_percent()
            );
        }
        let _ = writeln!(
            out,
            "{} sessions scanned, {} unreadable",
            self.scanned, self.unreadable
        );
        out
    }
}

pub struct StatsCollector {
    sessions: SessionStore,
}

impl StatsCollector {
    pub fn new(sessions: SessionStore) -> Self {
        StatsCollector { sessions }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        StatsCollector {
            sessions: SessionStore::new(config.file_system.clone(), &config.settings),
        }
    }

    /// Tally all local sessions, or only those inside the inclusive range.
    #[instrument(skip_all)]
    pub async fn collect(
        &self,
        range: Option<(SessionId, SessionId)>,
    ) -> Result<StatsSummary> {
        if let Some((start, end)) = &range {
            if start > end {
                return Err(RecordError::InvalidRange(format!(
                    "{} is after {}",
                    start, end
                )));
            }
        }

        let mut summary = StatsSummary::default();
        for session in self.sessions.list_sessions().await? {
            if let Some((start, end)) = &range {
                if session < *start || session > *end {
                    continue;
                }
            }
            let record = match self.read_record(&session).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(session = %session, error = %e, "skipping unreadable record");
                    summary.unreadable += 1;
                    continue;
                }
            };
            summary.scanned += 1;
            summary
                .per_kind
                .entry(record.metadata.session_kind)
                .or_default()
                .absorb(&record);
        }
        Ok(summary)
    }

    async fn read_record(&self, session: &SessionId) -> Result<SessionRecord> {
        let data = self.sessions.read_record(session).await?;
        SessionRecord::from_bytes(session, &data)
    }
}
