mod answer;
mod history;
mod ids;
mod question;
mod range;
mod session;
mod settings;

pub use ids::{HistoryEntryId, ParseIdError, QuestionId};

pub use answer::{Answer, AnswerValue};
pub use history::{
    DEFAULT_MAX_HISTORY_ENTRIES, DifficultyHistogram, HistoryEntry, HistorySettings,
    HistorySource, QuizRecord, ReadingRecord,
};
pub use question::{Difficulty, Question, QuestionDraft, QuestionError, QuestionKind};
pub use range::{MAX_QUESTIONS, MIN_QUESTIONS, QuestionRange, QuestionRangeError};
pub use session::{PersistedSession, Session, SessionPatch, SourceKind, TimerState};
pub use settings::{DEFAULT_PAGE_SIZE, SettingsError, StudySettings, StudySettingsDraft};
