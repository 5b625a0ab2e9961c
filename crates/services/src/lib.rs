#![forbid(unsafe_code)]

pub mod analysis;
pub mod app_services;
pub mod config;
pub mod error;
pub mod generation;
pub mod grading;
pub mod history;
pub mod reading_timer;
pub mod store;

pub use study_core::Clock;

pub use analysis::{AnalysisRequest, AnswerAnalysis, AnswerAnalyzer, HttpAnswerAnalyzer};
pub use app_services::AppServices;
pub use config::{EndpointConfig, ServiceConfig};
pub use error::{
    AnalysisError, AppServicesError, ConfigError, GenerationError, HistoryError, SubmissionError,
};
pub use generation::{
    GenerationNotice, GenerationPlan, GenerationReport, GenerationRequest, GenerationStatus,
    HttpQuestionGenerator, OrchestratorConfig, PageState, PageStatus, QuestionGenerator,
    QuestionOrchestrator,
};
pub use grading::GradingService;
pub use history::{HistoryRecorder, HistoryService, HistoryStats, StoredHistoryRecorder};
pub use reading_timer::{ReadingControl, ReadingOutcome, ReadingTimer};
pub use store::{SESSION_STORAGE_KEY, SessionStore};
