use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use study_core::Clock;
use study_core::model::{
    HistoryEntry, HistorySource, QuestionId, QuestionKind, ReadingRecord, Session, SourceKind,
};
use study_core::reading::count_words;
use study_core::scoring::{ScoreCard, ScoringPolicy, ShortAnswerAssessment, is_exact_match, score_with};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analysis::{AnalysisRequest, AnswerAnalyzer};
use crate::error::SubmissionError;
use crate::history::HistoryRecorder;

/// Grades submitted quizzes and hands the results to the history recorder.
#[derive(Clone)]
pub struct GradingService {
    clock: Clock,
    policy: ScoringPolicy,
    analyzer: Option<Arc<dyn AnswerAnalyzer>>,
    recorder: Arc<dyn HistoryRecorder>,
}

impl GradingService {
    #[must_use]
    pub fn new(clock: Clock, policy: ScoringPolicy, recorder: Arc<dyn HistoryRecorder>) -> Self {
        Self {
            clock,
            policy,
            analyzer: None,
            recorder,
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn AnswerAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Check that every question has a non-blank answer.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::NoQuestions` for an empty quiz and
    /// `SubmissionError::Unanswered` listing how many answers are missing.
    pub fn validate_submission(&self, session: &Session) -> Result<(), SubmissionError> {
        if session.questions().is_empty() {
            return Err(SubmissionError::NoQuestions);
        }
        match session.unanswered().len() {
            0 => Ok(()),
            count => Err(SubmissionError::Unanswered { count }),
        }
    }

    /// Score the session's answers.
    ///
    /// Short answers that do not match exactly are sent to the analyzer; when
    /// it is missing or fails, the local keyword heuristic decides.
    pub async fn grade(&self, session: &Session) -> ScoreCard {
        let assessments = self.assess_short_answers(session).await;
        let card = score_with(
            &self.policy,
            session.questions(),
            session.answers(),
            &assessments,
        );
        debug!(
            score = card.result.score,
            total = card.result.total_points,
            percentage = card.result.percentage,
            "quiz graded"
        );
        card
    }

    #[must_use]
    pub fn build_history_entry(
        &self,
        session: &Session,
        card: &ScoreCard,
        reading: ReadingRecord,
    ) -> HistoryEntry {
        let source = HistorySource {
            kind: session.source().unwrap_or(SourceKind::Text),
            size: u32::try_from(count_words(session.text())).unwrap_or(u32::MAX),
        };
        HistoryEntry::from_scorecard(self.clock.now(), source, reading, session.questions(), card)
    }

    /// Record `entry` in the background. Failures are logged.
    pub fn record(&self, entry: HistoryEntry) -> JoinHandle<()> {
        let recorder = Arc::clone(&self.recorder);
        tokio::spawn(async move {
            if let Err(err) = recorder.record(entry).await {
                warn!(error = %err, "failed to record history entry");
            }
        })
    }

    async fn assess_short_answers(
        &self,
        session: &Session,
    ) -> HashMap<QuestionId, ShortAnswerAssessment> {
        let Some(analyzer) = self.analyzer.as_ref() else {
            return HashMap::new();
        };

        let pending = session
            .questions()
            .iter()
            .filter(|q| q.kind() == QuestionKind::ShortAnswer)
            .filter_map(|q| {
                let answer = session.answer_for(q.id())?;
                if answer.value.is_blank() || is_exact_match(q, &answer.value) {
                    return None;
                }
                let request = AnalysisRequest {
                    question: q.prompt().to_string(),
                    user_answer: answer.value.as_text().into_owned(),
                    correct_answer: q.correct_answer().to_string(),
                    source_quote: q.source_quote().map(str::to_string),
                };
                let id = q.id().clone();
                Some(async move { (id, analyzer.analyze(request).await) })
            });

        join_all(pending)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(analysis) => Some((id, analysis.assessment)),
                Err(err) => {
                    warn!(question = %id, error = %err, "answer analysis failed, using heuristic");
                    None
                }
            })
            .collect()
    }
}
