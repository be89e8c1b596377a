//! # Rank Tracking
//!
//! Rank progression over time, built from the ranked sessions on disk. Only
//! sessions that carry both a player name and a final rank contribute;
//! practice sessions and unfinished ranked sessions are invisible here.

use std::collections::BTreeMap;

use core_runtime::config::CoreConfig;
use core_sync::{SessionId, SessionStore};
use tracing::{instrument, warn};

use crate::error::Result;
use crate::model::{Outcome, SessionKind, SessionRecord};

/// One ranked session's data point.
#[derive(Debug, Clone, PartialEq)]
pub struct RankPoint {
    pub session: SessionId,
    pub player: String,
    pub model: String,
    pub rank: u32,
    pub outcome: Option<Outcome>,
    pub fallback_percent: f64,
}

/// Per-player aggregate across the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRankSummary {
    pub player: String,
    pub first_rank: u32,
    pub last_rank: u32,
    pub games: u32,
    pub wins: u32,
}

impl PlayerRankSummary {
    /// Net rank change, positive when the player climbed.
    pub fn delta(&self) -> i64 {
        i64::from(self.last_rank) - i64::from(self.first_rank)
    }

    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            f64::from(self.wins) * 100.0 / f64::from(self.games)
        }
    }
}

/// The full timeline: points ascending by session id, summaries by player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankTimeline {
    pub points: Vec<RankPoint>,
    pub players: Vec<PlayerRankSummary>,
}

pub struct RankTracker {
    sessions: SessionStore,
}

impl RankTracker {
    pub fn new(sessions: SessionStore) -> Self {
        RankTracker { sessions }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        RankTracker {
            sessions: SessionStore::new(config.file_system.clone(), &config.settings),
        }
    }

    #[instrument(skip_all)]
    pub async fn timeline(&self) -> Result<RankTimeline> {
        let mut points = Vec::new();
        let mut by_player: BTreeMap<String, PlayerRankSummary> = BTreeMap::new();

        // list_sessions is ascending by id, so points arrive in play order.
        for session in self.sessions.list_sessions().await? {
            let record = match self.read_record(&session).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(session = %session, error = %e, "skipping unreadable record");
                    continue;
                }
            };
            if record.metadata.session_kind != SessionKind::Ranked {
                continue;
            }
            let (Some(player), Some(rank)) = (
                record.metadata.player_name.clone(),
                record.metadata.final_rank,
            ) else {
                continue;
            };
            // Rank 0 marks a session that never got rated.
            if rank == 0 {
                continue;
            }

            let summary = by_player
                .entry(player.clone())
                .or_insert_with(|| PlayerRankSummary {
                    player: player.clone(),
                    first_rank: rank,
                    last_rank: rank,
                    games: 0,
                    wins: 0,
                });
            summary.last_rank = rank;
            summary.games += 1;
            if record.metadata.outcome == Some(Outcome::Win) {
                summary.wins += 1;
            }

            points.push(RankPoint {
                session,
                player,
                model: record.metadata.model_name.clone(),
                rank,
                outcome: record.metadata.outcome,
                fallback_percent: record.metadata.fallback_move_percent,
            });
        }

        Ok(RankTimeline {
            points,
            players: by_player.into_values().collect(),
        })
    }

    async fn read_record(&self, session: &SessionId) -> Result<SessionRecord> {
        let data = self.sessions.read_record(session).await?;
        SessionRecord::from_bytes(session, &data)
    }
}
