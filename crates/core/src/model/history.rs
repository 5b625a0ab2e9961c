use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::HistoryEntryId;
use crate::model::question::{Difficulty, Question};
use crate::model::session::SourceKind;
use crate::scoring::{QuestionOutcome, ScoreCard};

/// Default cap on stored history entries.
pub const DEFAULT_MAX_HISTORY_ENTRIES: u32 = 100;

/// Whether completed sessions are recorded, and how many are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
    pub enabled: bool,
    pub max_entries: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_HISTORY_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Word count of the studied text.
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub estimated_sec: u64,
    pub actual_sec: u64,
    pub early_stop: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyHistogram {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl DifficultyHistogram {
    #[must_use]
    pub fn of(questions: &[Question]) -> Self {
        questions
            .iter()
            .fold(Self::default(), |mut histogram, question| {
                match question.difficulty() {
                    Difficulty::Easy => histogram.easy += 1,
                    Difficulty::Medium => histogram.medium += 1,
                    Difficulty::Hard => histogram.hard += 1,
                }
                histogram
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub question_count: u32,
    pub difficulty: DifficultyHistogram,
    pub answers: Vec<QuestionOutcome>,
    pub score: f64,
    pub total_points: f64,
    pub percentage: u8,
}

/// One completed study session, as kept in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    pub timestamp: DateTime<Utc>,
    pub source: HistorySource,
    pub reading: ReadingRecord,
    pub quiz: QuizRecord,
}

impl HistoryEntry {
    /// Builds an entry from a graded quiz.
    #[must_use]
    pub fn from_scorecard(
        timestamp: DateTime<Utc>,
        source: HistorySource,
        reading: ReadingRecord,
        questions: &[Question],
        card: &ScoreCard,
    ) -> Self {
        Self {
            id: HistoryEntryId::new_v4(),
            timestamp,
            source,
            reading,
            quiz: QuizRecord {
                question_count: card.result.total_questions,
                difficulty: DifficultyHistogram::of(questions),
                answers: card.outcomes.clone(),
                score: card.result.score,
                total_points: card.result.total_points,
                percentage: card.result.percentage,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, QuestionDraft, QuestionKind};
    use crate::scoring::{ScoringPolicy, score_with};
    use crate::time::fixed_now;
    use std::collections::HashMap;

    #[test]
    fn entry_captures_histogram_and_outcomes() {
        let questions = vec![
            QuestionDraft::new("q1", QuestionKind::TrueFalse, "A?", "True", Difficulty::Easy)
                .validate()
                .unwrap(),
            QuestionDraft::new("q2", QuestionKind::ShortAnswer, "B?", "cells", Difficulty::Hard)
                .validate()
                .unwrap(),
        ];
        let answers = vec![Answer::text("q1", "true")];
        let card = score_with(&ScoringPolicy::standard(), &questions, &answers, &HashMap::new());

        let entry = HistoryEntry::from_scorecard(
            fixed_now(),
            HistorySource { kind: SourceKind::Text, size: 420 },
            ReadingRecord { estimated_sec: 180, actual_sec: 95, early_stop: true },
            &questions,
            &card,
        );

        assert_eq!(entry.quiz.question_count, 2);
        assert_eq!(entry.quiz.difficulty, DifficultyHistogram { easy: 1, medium: 0, hard: 1 });
        assert_eq!(entry.quiz.answers.len(), 2);
        assert_eq!(entry.quiz.percentage, 25);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["source"]["type"], "text");
        assert_eq!(json["reading"]["earlyStop"], true);
        assert_eq!(json["quiz"]["answers"][0]["userAnswer"], "true");
    }

    #[test]
    fn default_settings_keep_one_hundred() {
        let settings = HistorySettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.max_entries, 100);
    }
}
