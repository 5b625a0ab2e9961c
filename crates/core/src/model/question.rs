use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: String },

    #[error("question {id} has no correct answer")]
    EmptyCorrectAnswer { id: String },

    #[error("multiple-choice question {id} needs at least two options")]
    MissingOptions { id: String },
}

//
// ─── KIND & DIFFICULTY ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::TrueFalse => "true-false",
            QuestionKind::ShortAnswer => "short-answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A generated quiz question. Immutable once validated.
///
/// Deserialization goes through [`QuestionDraft::validate`], so a `Question`
/// read back from storage upholds the same rules as a freshly generated one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    #[serde(rename = "type")]
    kind: QuestionKind,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Vec<String>>,
    correct_answer: String,
    difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_quote: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> Option<&[String]> {
        self.options.as_deref()
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn source_quote(&self) -> Option<&str> {
        self.source_quote.as_deref()
    }
}

/// Unvalidated question as produced by the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub source_quote: Option<String>,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: QuestionKind,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            prompt: prompt.into(),
            options: None,
            correct_answer: correct_answer.into(),
            difficulty,
            source_quote: None,
        }
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_source_quote(mut self, quote: impl Into<String>) -> Self {
        self.source_quote = Some(quote.into());
        self
    }

    /// Trim and check the draft, producing an immutable `Question`.
    ///
    /// True/false drafts without options get `["True", "False"]`; short-answer
    /// drafts never keep options.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id, prompt, or correct answer is blank,
    /// or when a multiple-choice draft has fewer than two options.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }
        let correct_answer = self.correct_answer.trim().to_string();
        if correct_answer.is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer { id });
        }

        let options = self.options.map(|opts| {
            opts.into_iter()
                .map(|opt| opt.trim().to_string())
                .filter(|opt| !opt.is_empty())
                .collect::<Vec<_>>()
        });

        let options = match self.kind {
            QuestionKind::MultipleChoice => match options {
                Some(opts) if opts.len() >= 2 => Some(opts),
                _ => return Err(QuestionError::MissingOptions { id }),
            },
            QuestionKind::TrueFalse => match options {
                Some(opts) if !opts.is_empty() => Some(opts),
                _ => Some(vec!["True".to_string(), "False".to_string()]),
            },
            QuestionKind::ShortAnswer => None,
        };

        let source_quote = self
            .source_quote
            .map(|quote| quote.trim().to_string())
            .filter(|quote| !quote.is_empty());

        Ok(Question {
            id: QuestionId::new(id),
            kind: self.kind,
            prompt,
            options,
            correct_answer,
            difficulty: self.difficulty,
            source_quote,
        })
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Question> for QuestionDraft {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.as_str().to_string(),
            kind: question.kind,
            prompt: question.prompt,
            options: question.options,
            correct_answer: question.correct_answer,
            difficulty: question.difficulty,
            source_quote: question.source_quote,
        }
    }
}
