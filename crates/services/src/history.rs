use std::sync::Arc;

use async_trait::async_trait;
use storage::repository::HistoryRepository;
use study_core::model::{HistoryEntry, HistoryEntryId, HistorySettings};
use tracing::{debug, info};

use crate::error::HistoryError;

/// Receives completed sessions.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record `entry`. Returns `false` when recording is turned off.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the entry cannot be stored.
    async fn record(&self, entry: HistoryEntry) -> Result<bool, HistoryError>;
}

/// Records into a `HistoryRepository`, honoring the stored history settings.
#[derive(Clone)]
pub struct StoredHistoryRecorder {
    repo: Arc<dyn HistoryRepository>,
}

impl StoredHistoryRecorder {
    #[must_use]
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl HistoryRecorder for StoredHistoryRecorder {
    async fn record(&self, entry: HistoryEntry) -> Result<bool, HistoryError> {
        let settings = self.repo.get_settings().await?.unwrap_or_default();
        if !settings.enabled {
            debug!("history disabled, entry not recorded");
            return Ok(false);
        }
        self.repo.append(&entry).await?;
        let dropped = self.repo.trim(settings.max_entries).await?;
        info!(id = %entry.id, percentage = entry.quiz.percentage, dropped, "history entry recorded");
        Ok(true)
    }
}

/// Aggregate figures over the whole history log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryStats {
    pub total_sessions: u32,
    /// Mean quiz percentage, rounded to one decimal.
    pub average_percentage: f64,
    /// Sum of actual reading time.
    pub total_study_sec: u64,
    pub total_questions: u32,
}

impl HistoryStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(entries: &[HistoryEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let percentage_sum: u64 = entries.iter().map(|e| u64::from(e.quiz.percentage)).sum();
        let mean = percentage_sum as f64 / entries.len() as f64;
        Self {
            total_sessions: u32::try_from(entries.len()).unwrap_or(u32::MAX),
            average_percentage: (mean * 10.0).round() / 10.0,
            total_study_sec: entries.iter().map(|e| e.reading.actual_sec).sum(),
            total_questions: entries
                .iter()
                .fold(0_u32, |sum, e| sum.saturating_add(e.quiz.question_count)),
        }
    }
}

/// Browsing and maintenance of the history log.
#[derive(Clone)]
pub struct HistoryService {
    repo: Arc<dyn HistoryRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if entries cannot be read.
    pub async fn list(&self, limit: Option<u32>) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self.repo.list(limit).await?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if entries cannot be read.
    pub async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let entries = self.repo.list(None).await?;
        Ok(HistoryStats::of(&entries))
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if the entry is missing or cannot be read.
    pub async fn get(&self, id: HistoryEntryId) -> Result<HistoryEntry, HistoryError> {
        Ok(self.repo.get(id).await?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if the entry is missing or cannot be removed.
    pub async fn delete(&self, id: HistoryEntryId) -> Result<(), HistoryError> {
        Ok(self.repo.delete(id).await?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if entries cannot be removed.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.repo.clear().await?;
        info!("history cleared");
        Ok(())
    }

    /// All entries, newest first, as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if entries cannot be read or serialized.
    pub async fn export_json(&self) -> Result<String, HistoryError> {
        let entries = self.repo.list(None).await?;
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError` if settings cannot be read.
    pub async fn settings(&self) -> Result<HistorySettings, HistoryError> {
        Ok(self.repo.get_settings().await?.unwrap_or_default())
    }

    /// Save settings and trim the log to the new limit right away.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::InvalidLimit` for a zero limit, or storage errors.
    pub async fn update_settings(&self, settings: HistorySettings) -> Result<(), HistoryError> {
        if settings.max_entries == 0 {
            return Err(HistoryError::InvalidLimit);
        }
        self.repo.save_settings(&settings).await?;
        let dropped = self.repo.trim(settings.max_entries).await?;
        info!(
            enabled = settings.enabled,
            max_entries = settings.max_entries,
            dropped,
            "history settings updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use study_core::model::{
        DifficultyHistogram, HistorySource, QuizRecord, ReadingRecord, SourceKind,
    };
    use study_core::time::fixed_now;

    fn entry() -> HistoryEntry {
        entry_with(50, 60, 5)
    }

    fn entry_with(percentage: u8, actual_sec: u64, question_count: u32) -> HistoryEntry {
        HistoryEntry {
            id: HistoryEntryId::new_v4(),
            timestamp: fixed_now(),
            source: HistorySource {
                kind: SourceKind::Text,
                size: 50,
            },
            reading: ReadingRecord {
                estimated_sec: 60,
                actual_sec,
                early_stop: false,
            },
            quiz: QuizRecord {
                question_count,
                difficulty: DifficultyHistogram::default(),
                answers: Vec::new(),
                score: 5.0,
                total_points: 10.0,
                percentage,
            },
        }
    }

    #[tokio::test]
    async fn recorder_skips_when_disabled() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = HistoryService::new(repo.clone());
        service
            .update_settings(HistorySettings {
                enabled: false,
                max_entries: 10,
            })
            .await
            .unwrap();

        let recorder = StoredHistoryRecorder::new(repo);
        assert!(!recorder.record(entry()).await.unwrap());
        assert!(service.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recorder_trims_to_limit() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = HistoryService::new(repo.clone());
        service
            .update_settings(HistorySettings {
                enabled: true,
                max_entries: 2,
            })
            .await
            .unwrap();

        let recorder = StoredHistoryRecorder::new(repo);
        let newest = entry();
        for e in [entry(), entry(), newest.clone()] {
            assert!(recorder.record(e).await.unwrap());
        }
        let listed = service.list(None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newest.id);
    }

    #[tokio::test]
    async fn export_and_settings_validation() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = HistoryService::new(repo.clone());
        assert_eq!(service.settings().await.unwrap(), HistorySettings::default());
        assert!(matches!(
            service
                .update_settings(HistorySettings {
                    enabled: true,
                    max_entries: 0
                })
                .await,
            Err(HistoryError::InvalidLimit)
        ));

        StoredHistoryRecorder::new(repo).record(entry()).await.unwrap();
        let json = service.export_json().await.unwrap();
        let parsed: Vec<HistoryEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(json.contains("\"percentage\": 50"));
    }

    #[test]
    fn stats_of_empty_log_are_zero() {
        assert_eq!(HistoryStats::of(&[]), HistoryStats::default());
    }

    #[tokio::test]
    async fn stats_sum_reading_time_and_questions() {
        let repo = Arc::new(InMemoryRepository::new());
        let recorder = StoredHistoryRecorder::new(repo.clone());
        for e in [entry_with(80, 120, 10), entry_with(65, 90, 12), entry_with(70, 30, 5)] {
            recorder.record(e).await.unwrap();
        }

        let stats = HistoryService::new(repo).stats().await.unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert!((stats.average_percentage - 71.7).abs() < 1e-9);
        assert_eq!(stats.total_study_sec, 240);
        assert_eq!(stats.total_questions, 27);
    }
}
