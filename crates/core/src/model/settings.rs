use thiserror::Error;

use crate::reading::DEFAULT_WORDS_PER_MINUTE;
use crate::scoring::ScoringPolicy;

/// Default number of questions requested per generation page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("words per minute must be between 50 and 1000 (got {0})")]
    InvalidWordsPerMinute(u32),

    #[error("page size must be between 1 and 50 (got {0})")]
    InvalidPageSize(u32),

    #[error("unknown scoring policy: {0}")]
    UnknownScoringPolicy(String),
}

/// Validated user-tunable settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudySettings {
    words_per_minute: u32,
    page_size: u32,
    scoring: ScoringPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct StudySettingsDraft {
    pub words_per_minute: Option<u32>,
    pub page_size: Option<u32>,
    pub scoring: Option<String>,
}

impl StudySettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a value is out of range or the scoring
    /// policy name is unknown.
    pub fn validate(self) -> Result<StudySettings, SettingsError> {
        let words_per_minute = self.words_per_minute.unwrap_or(DEFAULT_WORDS_PER_MINUTE);
        if !(50..=1000).contains(&words_per_minute) {
            return Err(SettingsError::InvalidWordsPerMinute(words_per_minute));
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=50).contains(&page_size) {
            return Err(SettingsError::InvalidPageSize(page_size));
        }

        let scoring = match self.scoring.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => ScoringPolicy::from_name(name)
                .ok_or_else(|| SettingsError::UnknownScoringPolicy(name.to_string()))?,
            None => ScoringPolicy::standard(),
        };

        Ok(StudySettings {
            words_per_minute,
            page_size,
            scoring,
        })
    }
}

impl StudySettings {
    #[must_use]
    pub fn words_per_minute(&self) -> u32 {
        self.words_per_minute
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            page_size: DEFAULT_PAGE_SIZE,
            scoring: ScoringPolicy::standard(),
        }
    }
}
