use serde::{Deserialize, Serialize};

use crate::model::answer::Answer;
use crate::model::ids::QuestionId;
use crate::model::question::Question;
use crate::model::range::QuestionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Full state of one study-and-quiz cycle.
///
/// Only `reducer::reduce` mutates a session. Questions are unique by id and
/// answers hold at most one entry per question id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub(crate) source: Option<SourceKind>,
    pub(crate) text: String,
    pub(crate) reading_duration_ms: u64,
    pub(crate) question_range: Option<QuestionRange>,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Answer>,
    pub(crate) timer_state: TimerState,
    pub(crate) time_remaining_ms: u64,
    pub(crate) epoch: u64,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn source(&self) -> Option<SourceKind> {
        self.source
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn reading_duration_ms(&self) -> u64 {
        self.reading_duration_ms
    }

    #[must_use]
    pub fn question_range(&self) -> Option<QuestionRange> {
        self.question_range
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn timer_state(&self) -> TimerState {
        self.timer_state
    }

    #[must_use]
    pub fn time_remaining_ms(&self) -> u64 {
        self.time_remaining_ms
    }

    /// Counter bumped whenever generated questions become stale.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn answer_for(&self, id: &QuestionId) -> Option<&Answer> {
        self.answers.iter().find(|answer| &answer.question_id == id)
    }

    /// Questions without a non-blank answer, in question order.
    #[must_use]
    pub fn unanswered(&self) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| self.answer_for(q.id()).is_none_or(|a| a.value.is_blank()))
            .collect()
    }

    /// The subset of fields that survives a reload.
    #[must_use]
    pub fn persisted(&self) -> PersistedSession {
        PersistedSession {
            source: self.source,
            text: self.text.clone(),
            reading_duration_ms: self.reading_duration_ms,
            question_range: self.question_range,
            questions: self.questions.clone(),
            answers: self.answers.clone(),
        }
    }
}

//
// ─── PERSISTENCE SHAPES ────────────────────────────────────────────────────────
//

/// Snapshot written to durable local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub source: Option<SourceKind>,
    #[serde(rename = "rawText", alias = "text")]
    pub text: String,
    #[serde(alias = "readingTimeMs")]
    pub reading_duration_ms: u64,
    pub question_range: Option<QuestionRange>,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

/// Partial session read back from storage; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionPatch {
    pub source: Option<SourceKind>,
    #[serde(alias = "rawText")]
    pub text: Option<String>,
    #[serde(alias = "readingTimeMs")]
    pub reading_duration_ms: Option<u64>,
    pub question_range: Option<QuestionRange>,
    pub questions: Option<Vec<Question>>,
    pub answers: Option<Vec<Answer>>,
}

impl From<PersistedSession> for SessionPatch {
    fn from(snapshot: PersistedSession) -> Self {
        Self {
            source: snapshot.source,
            text: Some(snapshot.text),
            reading_duration_ms: Some(snapshot.reading_duration_ms),
            question_range: snapshot.question_range,
            questions: Some(snapshot.questions),
            answers: Some(snapshot.answers),
        }
    }
}
