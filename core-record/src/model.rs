//! # Record Model
//!
//! The JSON document stored as each session's record file. Decoding is
//! lenient where history demands it: older records predate some fields, so
//! everything added since the first format ships with a default, and unknown
//! fields are ignored rather than rejected.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_sync::SessionId;
use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};

/// What kind of session was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Practice,
    Ranked,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Practice => f.write_str("practice"),
            SessionKind::Ranked => f.write_str("ranked"),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Aborted,
}

/// The kind of action taken on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Switch,
}

/// The action taken on a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAction {
    pub kind: ActionKind,
    pub name: String,
}

impl TurnAction {
    pub fn mv(name: impl Into<String>) -> Self {
        TurnAction {
            kind: ActionKind::Move,
            name: name.into(),
        }
    }

    pub fn switch(name: impl Into<String>) -> Self {
        TurnAction {
            kind: ActionKind::Switch,
            name: name.into(),
        }
    }
}

/// One logged turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEntry {
    /// 1-based position within the session
    pub turn_number: u32,
    #[serde(default)]
    pub state_summary: String,
    /// The model's stated reasoning for the action
    #[serde(default)]
    pub rationale: String,
    pub action: TurnAction,
    /// Whether the action was a fallback rather than a reasoned choice
    #[serde(default)]
    pub is_fallback: bool,
    pub logged_at: DateTime<Utc>,
}

/// Session-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub session_kind: SessionKind,
    pub started_at: DateTime<Utc>,
    /// Absent while the session is still running
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    /// Ladder rating after the session; ranked sessions only
    #[serde(default)]
    pub final_rank: Option<u32>,
    pub model_name: String,
    /// Account the session was played on; absent on older records
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub fallback_move_count: u32,
    #[serde(default)]
    pub total_move_count: u32,
    #[serde(default)]
    pub fallback_move_percent: f64,
}

/// The full record document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub metadata: RecordMetadata,
    #[serde(default)]
    pub turns: Vec<TurnEntry>,
}

impl SessionRecord {
    /// Decode a record file, attributing parse failures to the session.
    pub fn from_bytes(session: &SessionId, data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|source| RecordError::Malformed {
            session: session.clone(),
            source,
        })
    }

    /// Encode to the persisted form (pretty-printed JSON).
    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec_pretty(self)
            .map(Bytes::from)
            .map_err(RecordError::Encode)
    }

    /// Recompute the fallback counters from the turn list.
    pub fn recompute_counters(&mut self) {
        let total = self.turns.len() as u32;
        let fallback = self.turns.iter().filter(|t| t.is_fallback).count() as u32;
        self.metadata.total_move_count = total;
        self.metadata.fallback_move_count = fallback;
        self.metadata.fallback_move_percent = if total == 0 {
            0.0
        } else {
            f64::from(fallback) * 100.0 / f64::from(total)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            metadata: RecordMetadata {
                session_kind: SessionKind::Ranked,
                started_at: Utc.with_ymd_and_hms(2024, 11, 26, 10, 2, 0).unwrap(),
                ended_at: None,
                outcome: Some(Outcome::Win),
                final_rank: Some(1241),
                model_name: "sonnet".to_string(),
                player_name: Some("LoggingPlayer".to_string()),
                fallback_move_count: 0,
                total_move_count: 0,
                fallback_move_percent: 0.0,
            },
            turns: vec![],
        }
    }

    #[test]
    fn test_kinds_serialize_lowercase() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"session_kind\":\"ranked\""));
        assert!(json.contains("\"outcome\":\"win\""));
    }

    #[test]
    fn test_minimal_legacy_record_parses() {
        // Older records carry only the original fields.
        let json = r#"{
            "metadata": {
                "session_kind": "practice",
                "started_at": "2024-11-26T10:02:00Z",
                "model_name": "sonnet"
            }
        }"#;
        let session = SessionId::parse("20241126_100200").unwrap();
        let record = SessionRecord::from_bytes(&session, json.as_bytes()).unwrap();
        assert_eq!(record.metadata.session_kind, SessionKind::Practice);
        assert!(record.metadata.player_name.is_none());
        assert!(record.metadata.outcome.is_none());
        assert!(record.turns.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let json = r#"{
            "metadata": {
                "session_kind": "ranked",
                "started_at": "2024-11-26T10:02:00Z",
                "model_name": "sonnet",
                "battle_format": "gen9ou"
            },
            "turns": [],
            "extra": 7
        }"#;
        let session = SessionId::parse("20241126_100200").unwrap();
        assert!(SessionRecord::from_bytes(&session, json.as_bytes()).is_ok());
    }

    #[test]
    fn test_malformed_record_names_the_session() {
        let session = SessionId::parse("20241126_100200").unwrap();
        let err = SessionRecord::from_bytes(&session, b"{not json").unwrap_err();
        assert!(err.to_string().contains("20241126_100200"));
    }

    #[test]
    fn test_recompute_counters() {
        let mut record = sample_record();
        let at = Utc.with_ymd_and_hms(2024, 11, 26, 10, 3, 0).unwrap();
        for (i, fallback) in [false, true, false, true].iter().enumerate() {
            record.turns.push(TurnEntry {
                turn_number: (i + 1) as u32,
                state_summary: String::new(),
                rationale: String::new(),
                action: TurnAction::mv("thunderbolt"),
                is_fallback: *fallback,
                logged_at: at,
            });
        }
        record.recompute_counters();
        assert_eq!(record.metadata.total_move_count, 4);
        assert_eq!(record.metadata.fallback_move_count, 2);
        assert!((record.metadata.fallback_move_percent - 50.0).abs() < f64::EPSILON);
    }
}
