//! # Metadata Rectification
//!
//! Backfills the player name on historical records that predate the field.
//! Rules map inclusive session-id ranges to the account that was in use
//! during that period; records that already carry a name are left alone, so
//! running the same rules twice is a no-op.

use core_runtime::config::CoreConfig;
use core_sync::{SessionId, SessionStore};
use tracing::{debug, info, instrument, warn};

use crate::error::{RecordError, Result};
use crate::model::SessionRecord;

/// One backfill rule: sessions in `start..=end` belong to `player`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectifyRule {
    start: SessionId,
    end: SessionId,
    player: String,
}

impl RectifyRule {
    pub fn new(start: SessionId, end: SessionId, player: impl Into<String>) -> Result<Self> {
        if start > end {
            return Err(RecordError::InvalidRange(format!(
                "{} is after {}",
                start, end
            )));
        }
        Ok(RectifyRule {
            start,
            end,
            player: player.into(),
        })
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    fn matches(&self, session: &SessionId) -> bool {
        *session >= self.start && *session <= self.end
    }
}

pub struct MetadataRectifier {
    sessions: SessionStore,
}

impl MetadataRectifier {
    pub fn new(sessions: SessionStore) -> Self {
        MetadataRectifier { sessions }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        MetadataRectifier {
            sessions: SessionStore::new(config.file_system.clone(), &config.settings),
        }
    }

    /// Apply the rules to every local record, rewriting only records that
    /// actually change. Returns how many were rewritten. The first matching
    /// rule wins.
    #[instrument(skip_all, fields(rules = rules.len()))]
    pub async fn apply(&self, rules: &[RectifyRule]) -> Result<u32> {
        let mut modified = 0u32;
        for session in self.sessions.list_sessions().await? {
            let data = match self.sessions.read_record(&session).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(session = %session, error = %e, "skipping unreadable record");
                    continue;
                }
            };
            let mut record = match SessionRecord::from_bytes(&session, &data) {
                Ok(record) => record,
                Err(e) => {
                    warn!(session = %session, error = %e, "skipping unparseable record");
                    continue;
                }
            };

            if record.metadata.player_name.is_some() {
                continue;
            }
            let Some(rule) = rules.iter().find(|rule| rule.matches(&session)) else {
                debug!(session = %session, "no rule covers this session");
                continue;
            };

            record.metadata.player_name = Some(rule.player.clone());
            self.sessions
                .write_record(&session, record.to_bytes()?)
                .await?;
            modified += 1;
            debug!(session = %session, player = rule.player(), "player name backfilled");
        }
        info!(modified, "rectification complete");
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_range_is_inclusive() {
        let rule = RectifyRule::new(
            SessionId::parse("20241101_000000").unwrap(),
            SessionId::parse("20241130_235959").unwrap(),
            "LoggingPlayer",
        )
        .unwrap();

        assert!(rule.matches(&SessionId::parse("20241101_000000").unwrap()));
        assert!(rule.matches(&SessionId::parse("20241115_120000").unwrap()));
        assert!(rule.matches(&SessionId::parse("20241130_235959").unwrap()));
        assert!(!rule.matches(&SessionId::parse("20241201_000000").unwrap()));
        assert!(!rule.matches(&SessionId::parse("20241031_235959").unwrap()));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = RectifyRule::new(
            SessionId::parse("20241130_000000").unwrap(),
            SessionId::parse("20241101_000000").unwrap(),
            "LoggingPlayer",
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidRange(_)));
    }
}
