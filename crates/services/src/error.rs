//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{QuestionError, SettingsError};

/// Errors emitted while generating questions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("no study text to generate questions from")]
    MissingText,
    #[error("no question range configured")]
    MissingRange,
    #[error("question generation has not been started")]
    NotStarted,
    #[error("page {page} is outside the plan ({pages} pages)")]
    InvalidPage { page: u32, pages: u32 },
    #[error("session changed while questions were being generated")]
    Stale,
    #[error("only {accumulated} of {total} questions could be generated")]
    Incomplete { accumulated: u32, total: u32 },
    #[error("generation request failed with status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("failed to parse generated questions, please retry: {0}")]
    Parse(String),
    #[error(transparent)]
    Malformed(#[from] QuestionError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the short-answer analysis collaborator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error("answer analysis is not configured")]
    Disabled,
    #[error("analysis request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("failed to parse answer analysis: {0}")]
    Parse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Reasons a quiz cannot be submitted yet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("there are no questions to submit")]
    NoQuestions,
    #[error("{count} question(s) still need an answer")]
    Unanswered { count: usize },
}

/// Errors emitted by the history services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("history limit must be at least 1")]
    InvalidLimit,
    #[error(transparent)]
    Export(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading service configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
