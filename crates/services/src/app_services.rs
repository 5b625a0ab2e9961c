use std::sync::Arc;

use storage::repository::Storage;
use study_core::Clock;
use study_core::model::StudySettings;

use crate::analysis::{AnswerAnalyzer, HttpAnswerAnalyzer};
use crate::config::ServiceConfig;
use crate::error::AppServicesError;
use crate::generation::{HttpQuestionGenerator, OrchestratorConfig, QuestionGenerator, QuestionOrchestrator};
use crate::grading::GradingService;
use crate::history::{HistoryRecorder, HistoryService, StoredHistoryRecorder};
use crate::reading_timer::ReadingTimer;
use crate::store::SessionStore;

/// Assembles app-facing services around one hydrated session store.
#[derive(Clone)]
pub struct AppServices {
    settings: StudySettings,
    store: SessionStore,
    orchestrator: Arc<QuestionOrchestrator>,
    grading: Arc<GradingService>,
    history: Arc<HistoryService>,
    reading_timer: Arc<ReadingTimer>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured HTTP
    /// collaborators.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &ServiceConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let generator: Arc<dyn QuestionGenerator> =
            Arc::new(HttpQuestionGenerator::new(config.generation.clone()));
        let analyzer: Option<Arc<dyn AnswerAnalyzer>> = config
            .analysis
            .clone()
            .map(|endpoint| Arc::new(HttpAnswerAnalyzer::new(Some(endpoint))) as Arc<dyn AnswerAnalyzer>);
        Ok(Self::assemble(storage, config.settings, clock, generator, analyzer).await)
    }

    /// Wire services over existing storage and collaborators, then hydrate
    /// the session store.
    pub async fn assemble(
        storage: Storage,
        settings: StudySettings,
        clock: Clock,
        generator: Arc<dyn QuestionGenerator>,
        analyzer: Option<Arc<dyn AnswerAnalyzer>>,
    ) -> Self {
        let store = SessionStore::new(Arc::clone(&storage.blobs));
        store.hydrate().await;

        let orchestrator = QuestionOrchestrator::new(store.clone(), generator).with_config(
            OrchestratorConfig {
                page_size: settings.page_size(),
                ..OrchestratorConfig::default()
            },
        );
        let recorder: Arc<dyn HistoryRecorder> =
            Arc::new(StoredHistoryRecorder::new(Arc::clone(&storage.history)));
        let mut grading = GradingService::new(clock, *settings.scoring(), recorder);
        if let Some(analyzer) = analyzer {
            grading = grading.with_analyzer(analyzer);
        }

        Self {
            settings,
            orchestrator: Arc::new(orchestrator),
            grading: Arc::new(grading),
            history: Arc::new(HistoryService::new(Arc::clone(&storage.history))),
            reading_timer: Arc::new(ReadingTimer::new(store.clone())),
            store,
        }
    }

    #[must_use]
    pub fn settings(&self) -> StudySettings {
        self.settings
    }

    #[must_use]
    pub fn store(&self) -> SessionStore {
        self.store.clone()
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<QuestionOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    #[must_use]
    pub fn grading(&self) -> Arc<GradingService> {
        Arc::clone(&self.grading)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn reading_timer(&self) -> Arc<ReadingTimer> {
        Arc::clone(&self.reading_timer)
    }
}
