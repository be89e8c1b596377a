//! # Session Recorder
//!
//! Captures a live session turn by turn. The record file is rewritten after
//! every logged turn, so a crash mid-session loses at most the turn in
//! flight; the sync engine picks the file up as soon as the session's
//! directory exists.

use std::sync::Arc;

use bridge_traits::time::Clock;
use core_runtime::config::CoreConfig;
use core_sync::{SessionId, SessionStore};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::model::{
    Outcome, RecordMetadata, SessionKind, SessionRecord, TurnAction, TurnEntry,
};

/// Entry point for starting new sessions.
#[derive(Clone)]
pub struct SessionRecorder {
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
}

impl SessionRecorder {
    pub fn new(sessions: SessionStore, clock: Arc<dyn Clock>) -> Self {
        SessionRecorder { sessions, clock }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        SessionRecorder {
            sessions: SessionStore::new(config.file_system.clone(), &config.settings),
            clock: config.clock.clone(),
        }
    }

    /// Start a session: mint an id from the clock and persist the initial
    /// record immediately.
    #[instrument(skip(self, model_name), fields(kind = %kind, model = %model_name))]
    pub async fn begin(
        &self,
        kind: SessionKind,
        model_name: impl Into<String> + std::fmt::Display,
        player_name: Option<String>,
    ) -> Result<ActiveSession> {
        let id = SessionId::generate(self.clock.as_ref());
        let record = SessionRecord {
            metadata: RecordMetadata {
                session_kind: kind,
                started_at: self.clock.now(),
                ended_at: None,
                outcome: None,
                final_rank: None,
                model_name: model_name.into(),
                player_name,
                fallback_move_count: 0,
                total_move_count: 0,
                fallback_move_percent: 0.0,
            },
            turns: Vec::new(),
        };

        let session = ActiveSession {
            sessions: self.sessions.clone(),
            clock: self.clock.clone(),
            id,
            record,
        };
        session.persist().await?;
        info!(session = %session.id, "session started");
        Ok(session)
    }
}

/// A session being recorded. Consumed by [`finish`](ActiveSession::finish).
pub struct ActiveSession {
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    id: SessionId,
    record: SessionRecord,
}

impl ActiveSession {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Append a turn and persist the updated record.
    pub async fn log_turn(
        &mut self,
        state_summary: impl Into<String>,
        rationale: impl Into<String>,
        action: TurnAction,
        is_fallback: bool,
    ) -> Result<()> {
        let turn_number = self.record.turns.len() as u32 + 1;
        self.record.turns.push(TurnEntry {
            turn_number,
            state_summary: state_summary.into(),
            rationale: rationale.into(),
            action,
            is_fallback,
            logged_at: self.clock.now(),
        });
        self.record.recompute_counters();
        self.persist().await?;
        debug!(session = %self.id, turn = turn_number, fallback = is_fallback, "turn logged");
        Ok(())
    }

    /// Close the session with its outcome, persist the final record and
    /// return it.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn finish(
        mut self,
        outcome: Outcome,
        final_rank: Option<u32>,
    ) -> Result<SessionRecord> {
        self.record.metadata.ended_at = Some(self.clock.now());
        self.record.metadata.outcome = Some(outcome);
        self.record.metadata.final_rank = final_rank;
        self.record.recompute_counters();
        self.persist().await?;
        info!(
            turns = self.record.turns.len(),
            outcome = ?outcome,
            "session finished"
        );
        Ok(self.record)
    }

    async fn persist(&self) -> Result<()> {
        let data = self.record.to_bytes()?;
        self.sessions.write_record(&self.id, data).await?;
        Ok(())
    }
}
