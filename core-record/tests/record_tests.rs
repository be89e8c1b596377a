//! Recorder, stats, ranking and rectification tests against an in-memory
//! session tree.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{FileMetadata, FileSystemAccess};
use bridge_traits::time::{Clock, FixedClock};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_runtime::config::SyncSettings;
use core_record::{
    MetadataRectifier, Outcome, RankTracker, RecordMetadata, RectifyRule, SessionKind,
    SessionRecord, SessionRecorder, StatsCollector, TurnAction,
};
use core_sync::{SessionId, SessionStore};

#[derive(Default)]
struct FsState {
    files: BTreeMap<PathBuf, Bytes>,
    dirs: BTreeSet<PathBuf>,
}

#[derive(Default)]
struct InMemoryFileSystem {
    state: Mutex<FsState>,
}

impl InMemoryFileSystem {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn file(&self, path: &Path) -> Option<Bytes> {
        self.state.lock().unwrap().files.get(path).cloned()
    }
}

fn insert_dir_all(state: &mut FsState, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        state.dirs.insert(current.clone());
    }
}

#[async_trait]
impl FileSystemAccess for InMemoryFileSystem {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        let state = self.state.lock().unwrap();
        if let Some(data) = state.files.get(path) {
            return Ok(FileMetadata {
                size: data.len() as u64,
                modified_at: None,
                is_directory: false,
            });
        }
        if state.dirs.contains(path) {
            return Ok(FileMetadata {
                size: 0,
                modified_at: None,
                is_directory: true,
            });
        }
        Err(BridgeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.display().to_string(),
        )))
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        insert_dir_all(&mut self.state.lock().unwrap(), path);
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.file(path).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.display().to_string(),
            ))
        })
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = path.parent() {
            insert_dir_all(&mut state, parent);
        }
        state.files.insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        let data = state.files.remove(from).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                from.display().to_string(),
            ))
        })?;
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.state.lock().unwrap().files.remove(path);
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        let mut entries: BTreeSet<PathBuf> = BTreeSet::new();
        for candidate in state.files.keys().chain(state.dirs.iter()) {
            if candidate.parent() == Some(path) {
                entries.insert(candidate.clone());
            }
        }
        Ok(entries.into_iter().collect())
    }
}

fn settings() -> SyncSettings {
    let mut settings = SyncSettings::default();
    settings.base_dir = PathBuf::from("/logs");
    settings
}

fn session_store(fs: Arc<InMemoryFileSystem>) -> SessionStore {
    SessionStore::new(fs, &settings())
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, day, hour, 0, 0).unwrap()
}

fn ranked_record(
    started_at: DateTime<Utc>,
    player: Option<&str>,
    rank: Option<u32>,
    outcome: Option<Outcome>,
) -> SessionRecord {
    SessionRecord {
        metadata: RecordMetadata {
            session_kind: SessionKind::Ranked,
            started_at,
            ended_at: Some(started_at),
            outcome,
            final_rank: rank,
            model_name: "sonnet".to_string(),
            player_name: player.map(str::to_string),
            fallback_move_count: 0,
            total_move_count: 0,
            fallback_move_percent: 0.0,
        },
        turns: Vec::new(),
    }
}

async fn seed_record(store: &SessionStore, session: &str, record: &SessionRecord) -> SessionId {
    let id = SessionId::parse(session).unwrap();
    store
        .write_record(&id, record.to_bytes().unwrap())
        .await
        .unwrap();
    id
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recorder_persists_after_every_turn() {
    let fs = InMemoryFileSystem::new();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock(at(26, 10)));
    let recorder = SessionRecorder::new(session_store(fs.clone()), clock);

    let mut session = recorder
        .begin(SessionKind::Ranked, "sonnet", Some("LoggingPlayer".into()))
        .await
        .unwrap();
    assert_eq!(session.id().as_str(), "20241126_100000");

    // The initial record is on disk before any turn.
    let path = PathBuf::from("/logs/20241126_100000/session_log.json");
    assert!(fs.file(&path).is_some());

    session
        .log_turn("full health", "strongest STAB", TurnAction::mv("surf"), false)
        .await
        .unwrap();
    session
        .log_turn("", "", TurnAction::switch("rotom"), true)
        .await
        .unwrap();

    // Mid-session state is already durable.
    let on_disk = SessionRecord::from_bytes(
        session.id(),
        &fs.file(&path).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk.turns.len(), 2);
    assert_eq!(on_disk.metadata.fallback_move_count, 1);
    assert!(on_disk.metadata.ended_at.is_none());

    let finished = session.finish(Outcome::Win, Some(1241)).await.unwrap();
    assert_eq!(finished.metadata.outcome, Some(Outcome::Win));
    assert_eq!(finished.metadata.final_rank, Some(1241));
    assert_eq!(finished.metadata.total_move_count, 2);
    assert!((finished.metadata.fallback_move_percent - 50.0).abs() < f64::EPSILON);

    let on_disk = SessionRecord::from_bytes(
        &SessionId::parse("20241126_100000").unwrap(),
        &fs.file(&path).unwrap(),
    )
    .unwrap();
    assert!(on_disk.metadata.ended_at.is_some());
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_tally_per_kind_and_skip_unreadable() {
    let fs = InMemoryFileSystem::new();
    let store = session_store(fs.clone());

    let mut win = ranked_record(at(24, 8), Some("LoggingPlayer"), Some(1200), Some(Outcome::Win));
    win.turns.push(core_record::TurnEntry {
        turn_number: 1,
        state_summary: String::new(),
        rationale: String::new(),
        action: TurnAction::mv("surf"),
        is_fallback: false,
        logged_at: at(24, 8),
    });
    win.turns.push(core_record::TurnEntry {
        turn_number: 2,
        state_summary: String::new(),
        rationale: String::new(),
        action: TurnAction::switch("rotom"),
        is_fallback: true,
        logged_at: at(24, 8),
    });
    seed_record(&store, "20241124_080000", &win).await;

    let loss = ranked_record(at(25, 8), Some("LoggingPlayer"), Some(1180), Some(Outcome::Loss));
    seed_record(&store, "20241125_080000", &loss).await;

    let mut practice = ranked_record(at(26, 8), None, None, None);
    practice.metadata.session_kind = SessionKind::Practice;
    seed_record(&store, "20241126_080000", &practice).await;

    // A corrupt record is counted and skipped.
    fs.write_file(
        Path::new("/logs/20241127_080000/session_log.json"),
        Bytes::from_static(b"{corrupt"),
    )
    .await
    .unwrap();

    let collector = StatsCollector::new(store);
    let summary = collector.collect(None).await.unwrap();

    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.unreadable, 1);

    let ranked = &summary.per_kind[&SessionKind::Ranked];
    assert_eq!(ranked.games, 2);
    assert_eq!(ranked.wins, 1);
    assert_eq!(ranked.losses, 1);
    assert_eq!(ranked.moves, 1);
    assert_eq!(ranked.switches, 1);
    assert_eq!(ranked.fallback_moves, 1);
    assert!((ranked.win_rate() - 50.0).abs() < f64::EPSILON);

    let practice = &summary.per_kind[&SessionKind::Practice];
    assert_eq!(practice.games, 1);
    assert_eq!(practice.aborted, 1);
}

#[tokio::test]
async fn stats_range_is_inclusive() {
    let fs = InMemoryFileSystem::new();
    let store = session_store(fs);
    for day in [24, 25, 26] {
        let record = ranked_record(at(day, 8), None, None, Some(Outcome::Win));
        seed_record(&store, &format!("202411{}_080000", day), &record).await;
    }

    let collector = StatsCollector::new(store);
    let range = Some((
        SessionId::parse("20241124_080000").unwrap(),
        SessionId::parse("20241125_080000").unwrap(),
    ));
    let summary = collector.collect(range).await.unwrap();
    assert_eq!(summary.scanned, 2);

    let inverted = Some((
        SessionId::parse("20241126_080000").unwrap(),
        SessionId::parse("20241124_080000").unwrap(),
    ));
    assert!(collector.collect(inverted).await.is_err());
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rank_timeline_tracks_each_player_in_play_order() {
    let fs = InMemoryFileSystem::new();
    let store = session_store(fs);

    let sessions = [
        ("20241124_080000", "LoggingPlayer", 1100, Some(Outcome::Win)),
        ("20241125_080000", "LoggingPlayer", 1150, Some(Outcome::Win)),
        ("20241126_080000", "SC3Player", 1000, Some(Outcome::Loss)),
        ("20241127_080000", "LoggingPlayer", 1120, Some(Outcome::Loss)),
    ];
    for (session, player, rank, outcome) in sessions {
        let record = ranked_record(at(24, 8), Some(player), Some(rank), outcome);
        seed_record(&store, session, &record).await;
    }
    // Practice sessions and rankless records stay out of the timeline.
    let mut practice = ranked_record(at(28, 8), Some("LoggingPlayer"), Some(1300), None);
    practice.metadata.session_kind = SessionKind::Practice;
    seed_record(&store, "20241128_080000", &practice).await;
    let unranked = ranked_record(at(29, 8), Some("LoggingPlayer"), None, Some(Outcome::Win));
    seed_record(&store, "20241129_080000", &unranked).await;
    let unrated = ranked_record(at(30, 8), Some("LoggingPlayer"), Some(0), Some(Outcome::Win));
    seed_record(&store, "20241130_080000", &unrated).await;

    let timeline = RankTracker::new(store).timeline().await.unwrap();

    assert_eq!(timeline.points.len(), 4);
    let ranks: Vec<u32> = timeline
        .points
        .iter()
        .filter(|p| p.player == "LoggingPlayer")
        .map(|p| p.rank)
        .collect();
    assert_eq!(ranks, vec![1100, 1150, 1120]);

    let logging = timeline
        .players
        .iter()
        .find(|p| p.player == "LoggingPlayer")
        .unwrap();
    assert_eq!(logging.first_rank, 1100);
    assert_eq!(logging.last_rank, 1120);
    assert_eq!(logging.delta(), 20);
    assert_eq!(logging.games, 3);
    assert!((logging.win_rate() - 200.0 / 3.0).abs() < 0.01);

    let sc3 = timeline.players.iter().find(|p| p.player == "SC3Player").unwrap();
    assert_eq!(sc3.delta(), 0);
    assert_eq!(sc3.games, 1);
}

// ---------------------------------------------------------------------------
// Rectification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rectify_backfills_only_missing_names_and_is_idempotent() {
    let fs = InMemoryFileSystem::new();
    let store = session_store(fs.clone());

    // Two nameless records in different periods, one already named.
    seed_record(
        &store,
        "20241105_080000",
        &ranked_record(at(5, 8), None, Some(1000), Some(Outcome::Win)),
    )
    .await;
    seed_record(
        &store,
        "20241120_080000",
        &ranked_record(at(20, 8), None, Some(1050), Some(Outcome::Loss)),
    )
    .await;
    seed_record(
        &store,
        "20241121_080000",
        &ranked_record(at(21, 8), Some("MemoryPlayer"), Some(1080), None),
    )
    .await;
    // Outside every rule: left untouched.
    seed_record(
        &store,
        "20241201_080000",
        &ranked_record(at(30, 8), None, Some(1090), None),
    )
    .await;

    let rules = vec![
        RectifyRule::new(
            SessionId::parse("20241101_000000").unwrap(),
            SessionId::parse("20241110_235959").unwrap(),
            "LoggingPlayer",
        )
        .unwrap(),
        RectifyRule::new(
            SessionId::parse("20241111_000000").unwrap(),
            SessionId::parse("20241130_235959").unwrap(),
            "SC3Player",
        )
        .unwrap(),
    ];

    let rectifier = MetadataRectifier::new(store.clone());
    assert_eq!(rectifier.apply(&rules).await.unwrap(), 2);
    // Second pass finds nothing left to fix.
    assert_eq!(rectifier.apply(&rules).await.unwrap(), 0);

    let player_of = |session: &str| {
        let store = store.clone();
        let id = SessionId::parse(session).unwrap();
        async move {
            let data = store.read_record(&id).await.unwrap();
            SessionRecord::from_bytes(&id, &data)
                .unwrap()
                .metadata
                .player_name
        }
    };
    assert_eq!(
        player_of("20241105_080000").await,
        Some("LoggingPlayer".to_string())
    );
    assert_eq!(
        player_of("20241120_080000").await,
        Some("SC3Player".to_string())
    );
    assert_eq!(
        player_of("20241121_080000").await,
        Some("MemoryPlayer".to_string())
    );
    assert_eq!(player_of("20241201_080000").await, None);
}
