//! Pure session transitions.
//!
//! `reduce` is the only way a [`Session`] changes. Side effects (persistence,
//! network, timers) live in the services layer and feed results back in as
//! actions.

use std::collections::HashSet;

use crate::model::{
    Answer, Question, QuestionId, QuestionRange, Session, SessionPatch, SourceKind, TimerState,
};
use crate::reading::estimate_reading_ms;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetSource(SourceKind),
    /// New study text. Drops questions and answers and resets the timer.
    SetText {
        text: String,
        reading_duration_ms: u64,
    },
    SetReadingDuration(u64),
    SetQuestions(Vec<Question>),
    MergeQuestions(Vec<Question>),
    /// Generated questions, applied only while `epoch` is still current.
    ApplyGeneratedQuestions {
        epoch: u64,
        questions: Vec<Question>,
    },
    SetAnswer(Answer),
    ClearAnswer(QuestionId),
    ClearAnswers,
    SetQuestionRange(QuestionRange),
    SetTimerState(TimerState),
    SetTimeRemaining(u64),
    /// Discard the current quiz so a fresh one can be generated.
    RequestRegeneration,
    /// Start over, keeping only the question range.
    ResetSession,
    /// Forget the input text, keeping quiz and timer data.
    ClearInput,
    Hydrate(SessionPatch),
}

impl Action {
    /// `SetText` with the reading duration estimated from the text.
    #[must_use]
    pub fn text_with_estimate(text: impl Into<String>, words_per_minute: u32) -> Self {
        let text = text.into();
        let reading_duration_ms = estimate_reading_ms(&text, words_per_minute);
        Action::SetText {
            text,
            reading_duration_ms,
        }
    }
}

#[must_use]
pub fn reduce(session: &Session, action: Action) -> Session {
    let mut next = session.clone();
    match action {
        Action::SetSource(source) => next.source = Some(source),
        Action::SetText {
            text,
            reading_duration_ms,
        } => {
            next.text = text;
            next.reading_duration_ms = reading_duration_ms;
            next.questions.clear();
            next.answers.clear();
            next.timer_state = TimerState::Idle;
            next.time_remaining_ms = reading_duration_ms;
            next.epoch = next.epoch.wrapping_add(1);
        }
        Action::SetReadingDuration(ms) => {
            next.reading_duration_ms = ms;
            next.timer_state = TimerState::Idle;
            next.time_remaining_ms = ms;
        }
        Action::SetQuestions(questions) => next.questions = dedupe(questions),
        Action::MergeQuestions(questions) => {
            let mut seen: HashSet<QuestionId> =
                next.questions.iter().map(|q| q.id().clone()).collect();
            next.questions
                .extend(questions.into_iter().filter(|q| seen.insert(q.id().clone())));
        }
        Action::ApplyGeneratedQuestions { epoch, questions } => {
            if epoch == next.epoch {
                next.questions = dedupe(questions);
            }
        }
        Action::SetAnswer(answer) => upsert_answer(&mut next.answers, answer),
        Action::ClearAnswer(id) => next.answers.retain(|a| a.question_id != id),
        Action::ClearAnswers => next.answers.clear(),
        Action::SetQuestionRange(range) => next.question_range = Some(range),
        Action::SetTimerState(state) => next.timer_state = state,
        Action::SetTimeRemaining(ms) => next.time_remaining_ms = ms,
        Action::RequestRegeneration => {
            next.questions.clear();
            next.answers.clear();
            next.epoch = next.epoch.wrapping_add(1);
        }
        Action::ResetSession => {
            next = Session {
                question_range: session.question_range,
                epoch: session.epoch.wrapping_add(1),
                ..Session::default()
            };
        }
        Action::ClearInput => {
            next.source = None;
            next.text.clear();
            next.reading_duration_ms = 0;
        }
        Action::Hydrate(patch) => hydrate(&mut next, patch),
    }
    next
}

fn hydrate(session: &mut Session, patch: SessionPatch) {
    if let Some(source) = patch.source {
        session.source = Some(source);
    }
    if let Some(text) = patch.text {
        session.text = text;
    }
    if let Some(ms) = patch.reading_duration_ms {
        session.reading_duration_ms = ms;
        if session.timer_state == TimerState::Idle {
            session.time_remaining_ms = ms;
        }
    }
    if let Some(range) = patch.question_range {
        session.question_range = Some(range);
    }
    if let Some(questions) = patch.questions {
        session.questions = dedupe(questions);
    }
    if let Some(answers) = patch.answers {
        session.answers.clear();
        for answer in answers {
            upsert_answer(&mut session.answers, answer);
        }
    }
}

fn dedupe(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id().clone()))
        .collect()
}

fn upsert_answer(answers: &mut Vec<Answer>, answer: Answer) {
    match answers
        .iter_mut()
        .find(|existing| existing.question_id == answer.question_id)
    {
        Some(existing) => *existing = answer,
        None => answers.push(answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionDraft, QuestionKind};

    fn question(id: &str) -> Question {
        QuestionDraft::new(id, QuestionKind::TrueFalse, format!("Is {id} true?"), "True", Difficulty::Easy)
            .validate()
            .unwrap()
    }

    fn ids(session: &Session) -> Vec<&str> {
        session.questions().iter().map(|q| q.id().as_str()).collect()
    }

    fn quiz_session() -> Session {
        let session = reduce(&Session::new(), Action::SetSource(SourceKind::Text));
        let session = reduce(
            &session,
            Action::SetText {
                text: "Cells divide.".into(),
                reading_duration_ms: 60_000,
            },
        );
        let session = reduce(
            &session,
            Action::SetQuestionRange(QuestionRange::new(5, 10).unwrap()),
        );
        let session = reduce(&session, Action::SetQuestions(vec![question("q1"), question("q2")]));
        reduce(&session, Action::SetAnswer(Answer::text("q1", "True")))
    }

    #[test]
    fn set_text_clears_quiz_and_resets_timer() {
        let session = reduce(&quiz_session(), Action::SetTimerState(TimerState::Running));
        let epoch = session.epoch();
        let next = reduce(
            &session,
            Action::SetText {
                text: "Other".into(),
                reading_duration_ms: 120_000,
            },
        );
        assert!(next.questions().is_empty());
        assert!(next.answers().is_empty());
        assert_eq!(next.timer_state(), TimerState::Idle);
        assert_eq!(next.time_remaining_ms(), 120_000);
        assert_eq!(next.epoch(), epoch + 1);
    }

    #[test]
    fn reset_keeps_only_question_range() {
        let session = quiz_session();
        let next = reduce(&session, Action::ResetSession);
        assert!(next.questions().is_empty());
        assert!(next.answers().is_empty());
        assert!(next.text().is_empty());
        assert_eq!(next.source(), None);
        assert_eq!(next.question_range(), session.question_range());
        assert!(next.epoch() > session.epoch());
    }

    #[test]
    fn set_reading_duration_resets_timer_but_keeps_quiz() {
        let session = reduce(&quiz_session(), Action::SetTimerState(TimerState::Paused));
        let session = reduce(&session, Action::SetTimeRemaining(12_000));
        let next = reduce(&session, Action::SetReadingDuration(90_000));
        assert_eq!(next.reading_duration_ms(), 90_000);
        assert_eq!(next.timer_state(), TimerState::Idle);
        assert_eq!(next.time_remaining_ms(), 90_000);
        assert_eq!(next.questions(), session.questions());
        assert_eq!(next.answers(), session.answers());
        assert_eq!(next.epoch(), session.epoch());
    }

    #[test]
    fn clear_answers_keeps_questions() {
        let session = reduce(&quiz_session(), Action::SetAnswer(Answer::text("q2", "False")));
        assert_eq!(session.answers().len(), 2);
        let next = reduce(&session, Action::ClearAnswers);
        assert!(next.answers().is_empty());
        assert_eq!(ids(&next), ["q1", "q2"]);
        assert_eq!(next.text(), session.text());
    }

    #[test]
    fn clear_input_keeps_quiz_and_timer() {
        let session = reduce(&quiz_session(), Action::SetTimeRemaining(42_000));
        let next = reduce(&session, Action::ClearInput);
        assert!(next.text().is_empty());
        assert_eq!(next.source(), None);
        assert_eq!(next.reading_duration_ms(), 0);
        assert_eq!(next.questions(), session.questions());
        assert_eq!(next.answers(), session.answers());
        assert_eq!(next.time_remaining_ms(), 42_000);
        assert_eq!(next.epoch(), session.epoch());
    }

    #[test]
    fn answers_are_unique_per_question() {
        let session = quiz_session();
        let session = reduce(&session, Action::SetAnswer(Answer::text("q1", "False")));
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.answers()[0].value.as_text(), "False");

        let session = reduce(&session, Action::ClearAnswer(QuestionId::new("q1")));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn questions_are_deduplicated_first_wins() {
        let session = reduce(
            &Session::new(),
            Action::SetQuestions(vec![question("a"), question("b"), question("a")]),
        );
        assert_eq!(ids(&session), ["a", "b"]);

        let session = reduce(&session, Action::MergeQuestions(vec![question("b"), question("c")]));
        assert_eq!(ids(&session), ["a", "b", "c"]);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let session = quiz_session();
        let stale = session.epoch();
        let session = reduce(&session, Action::RequestRegeneration);
        assert!(session.questions().is_empty());

        let ignored = reduce(
            &session,
            Action::ApplyGeneratedQuestions {
                epoch: stale,
                questions: vec![question("old")],
            },
        );
        assert!(ignored.questions().is_empty());

        let applied = reduce(
            &session,
            Action::ApplyGeneratedQuestions {
                epoch: session.epoch(),
                questions: vec![question("new")],
            },
        );
        assert_eq!(ids(&applied), ["new"]);
    }

    #[test]
    fn hydrate_merges_only_present_fields() {
        let session = reduce(&Session::new(), Action::SetQuestionRange(QuestionRange::new(6, 12).unwrap()));
        let patch = SessionPatch {
            text: Some("Restored text".into()),
            reading_duration_ms: Some(90_000),
            answers: Some(vec![Answer::text("q1", "a"), Answer::text("q1", "b")]),
            ..SessionPatch::default()
        };
        let next = reduce(&session, Action::Hydrate(patch));
        assert_eq!(next.text(), "Restored text");
        assert_eq!(next.time_remaining_ms(), 90_000);
        assert_eq!(next.question_range(), session.question_range());
        assert_eq!(next.answers().len(), 1);
        assert_eq!(next.answers()[0].value.as_text(), "b");
    }

    #[test]
    fn text_with_estimate_uses_reading_speed() {
        let action = Action::text_with_estimate("word ".repeat(250), 200);
        assert_eq!(
            action,
            Action::SetText {
                text: "word ".repeat(250),
                reading_duration_ms: 120_000,
            }
        );
    }

    #[test]
    fn reducer_does_not_mutate_input() {
        let session = quiz_session();
        let before = session.clone();
        let _ = reduce(&session, Action::ResetSession);
        assert_eq!(session, before);
    }
}
