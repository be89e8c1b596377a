//! # Session Records
//!
//! The payload side of the engine: what a session log contains and the tools
//! that produce and analyze it. The sync engine in `core-sync` moves these
//! records around without looking inside them; everything that *does* look
//! inside lives here.
//!
//! - `model`: the record document and its JSON shape
//! - `recorder`: turn-by-turn capture of a live session
//! - `stats`: per-kind outcome and action tallies over a session range
//! - `ranking`: rank progression of ranked sessions, per player
//! - `rectify`: backfilling player names on historical records

pub mod error;
pub mod model;
pub mod ranking;
pub mod recorder;
pub mod rectify;
pub mod stats;

pub use error::{RecordError, Result};
pub use model::{
    ActionKind, Outcome, RecordMetadata, SessionKind, SessionRecord, TurnAction, TurnEntry,
};
pub use ranking::{PlayerRankSummary, RankPoint, RankTimeline, RankTracker};
pub use recorder::{ActiveSession, SessionRecorder};
pub use rectify::{MetadataRectifier, RectifyRule};
pub use stats::{KindTally, StatsCollector, StatsSummary};
