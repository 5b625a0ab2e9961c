use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::model::ids::QuestionId;

/// What the user entered for a question.
///
/// Multi-select answers are kept as a list instead of a comma-joined string, so
/// option text containing commas stays unambiguous. Serialized untagged: a JSON
/// string or a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choices(values.into_iter().map(Into::into).collect())
    }

    /// True when nothing meaningful was entered.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Choices(choices) => choices.iter().all(|c| c.trim().is_empty()),
        }
    }

    /// Single-string rendering; selections are joined with `", "`.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            AnswerValue::Text(text) => Cow::Borrowed(text.as_str()),
            AnswerValue::Choices(choices) => Cow::Owned(choices.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: QuestionId,
    #[serde(alias = "answer")]
    pub value: AnswerValue,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: impl Into<QuestionId>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            value,
        }
    }

    #[must_use]
    pub fn text(question_id: impl Into<QuestionId>, value: impl Into<String>) -> Self {
        Self::new(question_id, AnswerValue::text(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_string_or_list_payloads() {
        let single: Answer =
            serde_json::from_str(r#"{"questionId": "q1", "answer": "Paris"}"#).unwrap();
        assert_eq!(single.value, AnswerValue::text("Paris"));

        let multi: Answer =
            serde_json::from_str(r#"{"questionId": "q2", "value": ["a", "b, c"]}"#).unwrap();
        assert_eq!(multi.value, AnswerValue::choices(["a", "b, c"]));
        assert_eq!(multi.value.as_text(), "a, b, c");
    }

    #[test]
    fn blank_detection() {
        assert!(AnswerValue::text("   ").is_blank());
        assert!(AnswerValue::choices(Vec::<String>::new()).is_blank());
        assert!(!AnswerValue::choices(["x"]).is_blank());
    }
}
