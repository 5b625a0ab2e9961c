//! Answer normalization and scoring.
//!
//! Everything here is a pure function of its inputs. Short-answer questions may
//! carry an assessment from an external analysis service; when none is supplied
//! a local keyword-overlap heuristic decides.

mod normalize;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerValue, Difficulty, Question, QuestionId, QuestionKind};

pub use normalize::{canonical_truth, keyword_overlap, normalize, selection_key};

/// Keyword overlap at or above which a short answer earns full credit.
pub const FULL_CREDIT_OVERLAP: f64 = 0.7;
/// Keyword overlap at or above which a short answer earns partial credit.
pub const PARTIAL_CREDIT_OVERLAP: f64 = 0.5;

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Point weights per difficulty plus an optional penalty for wrong answers.
///
/// `wrong_penalty` is a fraction of the question weight subtracted when an
/// answered question earns no credit. Unanswered questions are never penalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
    pub wrong_penalty: f64,
}

impl ScoringPolicy {
    /// 1/2/3 points, no penalty.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            easy: 1.0,
            medium: 2.0,
            hard: 3.0,
            wrong_penalty: 0.0,
        }
    }

    /// 10/20/30 points, wrong answers cost half their weight.
    #[must_use]
    pub fn weighted() -> Self {
        Self {
            easy: 10.0,
            medium: 20.0,
            hard: 30.0,
            wrong_penalty: 0.5,
        }
    }

    /// Looks up a preset by name (`"standard"` or `"weighted"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(Self::standard()),
            "weighted" => Some(Self::weighted()),
            _ => None,
        }
    }

    #[must_use]
    pub fn weight(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Verdict returned by the external short-answer analysis service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortAnswerAssessment {
    /// Fraction of credit in `[0, 1]`.
    pub score: f64,
    pub is_correct: bool,
}

/// Aggregate quiz result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: f64,
    pub total_points: f64,
    pub percentage: u8,
    pub correct_answers: u32,
    pub total_questions: u32,
}

/// How a single question was scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub correct: bool,
    pub difficulty: Difficulty,
    pub points: f64,
}

/// Aggregate result together with the per-question breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub result: ScoreResult,
    pub outcomes: Vec<QuestionOutcome>,
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Scores with the standard 1/2/3 policy and no external assessments.
#[must_use]
pub fn score(questions: &[Question], answers: &[Answer]) -> ScoreResult {
    score_with(&ScoringPolicy::standard(), questions, answers, &HashMap::new()).result
}

/// Scores every question in order and aggregates the result.
#[must_use]
pub fn score_with(
    policy: &ScoringPolicy,
    questions: &[Question],
    answers: &[Answer],
    assessments: &HashMap<QuestionId, ShortAnswerAssessment>,
) -> ScoreCard {
    let mut score = 0.0;
    let mut total_points = 0.0;
    let mut correct_answers = 0_u32;
    let mut outcomes = Vec::with_capacity(questions.len());

    for question in questions {
        let weight = policy.weight(question.difficulty());
        total_points += weight;

        let answer = answers.iter().find(|a| &a.question_id == question.id());
        let (verdict, user_answer) = match answer {
            Some(answer) if !answer.value.is_blank() => (
                evaluate(question, &answer.value, assessments.get(question.id())),
                answer.value.as_text().into_owned(),
            ),
            _ => (Verdict::unanswered(), String::new()),
        };

        let points = if verdict.credit > 0.0 {
            weight * verdict.credit
        } else if verdict.answered && policy.wrong_penalty > 0.0 {
            -(weight * policy.wrong_penalty)
        } else {
            0.0
        };

        score += points;
        if verdict.correct {
            correct_answers = correct_answers.saturating_add(1);
        }

        outcomes.push(QuestionOutcome {
            question_id: question.id().clone(),
            kind: question.kind(),
            question: question.prompt().to_string(),
            user_answer,
            correct_answer: question.correct_answer().to_string(),
            correct: verdict.correct,
            difficulty: question.difficulty(),
            points,
        });
    }

    ScoreCard {
        result: ScoreResult {
            score,
            total_points,
            percentage: percentage(score, total_points),
            correct_answers,
            total_questions: u32::try_from(questions.len()).unwrap_or(u32::MAX),
        },
        outcomes,
    }
}

/// True when `value` matches the question's correct answer exactly after
/// trimming and lowercasing.
#[must_use]
pub fn is_exact_match(question: &Question, value: &AnswerValue) -> bool {
    normalize(&value.as_text()) == normalize(question.correct_answer())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percentage(score: f64, total_points: f64) -> u8 {
    if total_points <= 0.0 {
        return 0;
    }
    (100.0 * score / total_points).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy)]
struct Verdict {
    answered: bool,
    correct: bool,
    credit: f64,
}

impl Verdict {
    fn unanswered() -> Self {
        Self {
            answered: false,
            correct: false,
            credit: 0.0,
        }
    }

    fn binary(correct: bool) -> Self {
        Self {
            answered: true,
            correct,
            credit: if correct { 1.0 } else { 0.0 },
        }
    }

    fn partial(credit: f64) -> Self {
        Self {
            answered: true,
            correct: false,
            credit,
        }
    }
}

fn evaluate(
    question: &Question,
    value: &AnswerValue,
    assessment: Option<&ShortAnswerAssessment>,
) -> Verdict {
    match question.kind() {
        QuestionKind::MultipleChoice => Verdict::binary(choice_matches(question, value)),
        QuestionKind::TrueFalse => Verdict::binary(truth_matches(question, value)),
        QuestionKind::ShortAnswer => short_answer_verdict(question, value, assessment),
    }
}

fn choice_matches(question: &Question, value: &AnswerValue) -> bool {
    if is_exact_match(question, value) {
        return true;
    }
    let correct = question.correct_answer();
    let multi = matches!(value, AnswerValue::Choices(_))
        || correct.contains(',')
        || value.as_text().contains(',');
    if !multi {
        return false;
    }
    selection_key(normalize::selections(value)) == selection_key(correct.split(','))
}

fn truth_matches(question: &Question, value: &AnswerValue) -> bool {
    let given = value.as_text();
    match (canonical_truth(&given), canonical_truth(question.correct_answer())) {
        (Some(given), Some(expected)) => given == expected,
        _ => is_exact_match(question, value),
    }
}

fn short_answer_verdict(
    question: &Question,
    value: &AnswerValue,
    assessment: Option<&ShortAnswerAssessment>,
) -> Verdict {
    if is_exact_match(question, value) {
        return Verdict::binary(true);
    }
    if let Some(assessment) = assessment {
        let credit = if assessment.score.is_finite() {
            assessment.score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        return Verdict {
            answered: true,
            correct: assessment.is_correct,
            credit,
        };
    }
    let overlap = keyword_overlap(question.correct_answer(), &value.as_text());
    if overlap >= FULL_CREDIT_OVERLAP {
        Verdict::binary(true)
    } else if overlap >= PARTIAL_CREDIT_OVERLAP {
        Verdict::partial(overlap)
    } else {
        Verdict::binary(false)
    }
}
