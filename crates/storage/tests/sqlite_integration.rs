use chrono::Duration;
use storage::repository::{BlobRepository, HistoryRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;
use study_core::model::{
    DifficultyHistogram, HistoryEntry, HistoryEntryId, HistorySettings, HistorySource,
    QuizRecord, ReadingRecord, SourceKind,
};
use study_core::time::fixed_now;

fn entry(offset_secs: i64, percentage: u8) -> HistoryEntry {
    HistoryEntry {
        id: HistoryEntryId::new_v4(),
        timestamp: fixed_now() + Duration::seconds(offset_secs),
        source: HistorySource {
            kind: SourceKind::Pdf,
            size: 900,
        },
        reading: ReadingRecord {
            estimated_sec: 300,
            actual_sec: 280,
            early_stop: false,
        },
        quiz: QuizRecord {
            question_count: 10,
            difficulty: DifficultyHistogram {
                easy: 3,
                medium: 4,
                hard: 3,
            },
            answers: Vec::new(),
            score: 12.0,
            total_points: 20.0,
            percentage,
        },
    }
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_blob_upserts_latest_value() {
    let repo = connect("memdb_blobs").await;

    assert_eq!(repo.read_blob("study-timer-session").await.unwrap(), None);
    repo.write_blob("study-timer-session", r#"{"rawText":"a"}"#)
        .await
        .unwrap();
    repo.write_blob("study-timer-session", r#"{"rawText":"b"}"#)
        .await
        .unwrap();
    assert_eq!(
        repo.read_blob("study-timer-session").await.unwrap().as_deref(),
        Some(r#"{"rawText":"b"}"#)
    );

    repo.remove_blob("study-timer-session").await.unwrap();
    assert_eq!(repo.read_blob("study-timer-session").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_history_orders_trims_and_deletes() {
    let repo = connect("memdb_history").await;

    let oldest = entry(0, 40);
    let middle = entry(60, 60);
    let newest = entry(120, 80);
    for e in [&oldest, &middle, &newest] {
        repo.append(e).await.unwrap();
    }

    let listed = repo.list(None).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|e| e.id).collect();
    assert_eq!(ids, [newest.id, middle.id, oldest.id]);
    assert_eq!(repo.list(Some(1)).await.unwrap()[0], newest);

    assert!(matches!(repo.append(&newest).await, Err(StorageError::Conflict)));

    assert_eq!(repo.trim(2).await.unwrap(), 1);
    assert!(matches!(repo.get(oldest.id).await, Err(StorageError::NotFound)));

    repo.delete(middle.id).await.unwrap();
    assert!(matches!(repo.delete(middle.id).await, Err(StorageError::NotFound)));
    assert_eq!(repo.list(None).await.unwrap(), vec![newest]);

    repo.clear().await.unwrap();
    assert!(repo.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_history_settings_roundtrip() {
    let repo = connect("memdb_settings").await;
    assert_eq!(repo.get_settings().await.unwrap(), None);

    let settings = HistorySettings {
        enabled: false,
        max_entries: 25,
    };
    repo.save_settings(&settings).await.unwrap();
    assert_eq!(repo.get_settings().await.unwrap(), Some(settings));
}

#[tokio::test]
async fn storage_sqlite_runs_migrations_idempotently() {
    let url = "sqlite:file:memdb_storage?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.expect("first init");
    storage.blobs.write_blob("k", "v").await.unwrap();

    let again = Storage::sqlite(url).await.expect("second init");
    assert_eq!(again.blobs.read_blob("k").await.unwrap().as_deref(), Some("v"));
}
