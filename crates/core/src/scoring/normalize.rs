//! Answer normalization shared by the scoring rules.

use std::collections::BTreeSet;

use crate::model::AnswerValue;

const TRUE_TOKENS: [&str; 6] = ["true", "verdadero", "vrai", "wahr", "vero", "verdadeiro"];
const FALSE_TOKENS: [&str; 4] = ["false", "falso", "faux", "falsch"];

/// Trimmed, lowercased form used for every string comparison.
#[must_use]
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Maps a localized true/false token to its canonical truth value.
///
/// Covers English, Spanish, French, German, Italian and Portuguese. Unknown
/// tokens yield `None`.
#[must_use]
pub fn canonical_truth(value: &str) -> Option<bool> {
    let token = normalize(value);
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Normalized, deduplicated, order-independent key for a set of selections.
#[must_use]
pub fn selection_key<'a, I>(selections: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    selections
        .into_iter()
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(",")
}

/// Individual selections of an answer; comma-joined text is split.
#[must_use]
pub fn selections(value: &AnswerValue) -> Vec<&str> {
    match value {
        AnswerValue::Text(text) => text.split(',').collect(),
        AnswerValue::Choices(choices) => choices.iter().map(String::as_str).collect(),
    }
}

fn significant_words(value: &str) -> Vec<String> {
    value
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_owned)
        .collect()
}

/// Fraction of the expected answer's significant words (longer than two
/// characters) that appear, as a substring in either direction, among the
/// user's significant words. Word order is ignored.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn keyword_overlap(expected: &str, given: &str) -> f64 {
    let expected_words = significant_words(expected);
    if expected_words.is_empty() {
        return 0.0;
    }
    let given_words = significant_words(given);
    let matched = expected_words
        .iter()
        .filter(|word| {
            given_words
                .iter()
                .any(|g| g.contains(word.as_str()) || word.contains(g.as_str()))
        })
        .count();
    matched as f64 / expected_words.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table_covers_locales() {
        for token in ["True", " VERDADERO ", "vrai", "Wahr", "vero", "Verdadeiro"] {
            assert_eq!(canonical_truth(token), Some(true), "{token}");
        }
        for token in ["false", "Falso", "FAUX", "falsch"] {
            assert_eq!(canonical_truth(token), Some(false), "{token}");
        }
        assert_eq!(canonical_truth("maybe"), None);
    }

    #[test]
    fn selection_key_ignores_order_case_and_duplicates() {
        let a = selection_key(["B", " a", "b"]);
        let b = selection_key(["a", "b"]);
        assert_eq!(a, b);
        assert_eq!(a, "a,b");
    }

    #[test]
    fn keyword_overlap_ignores_order_and_short_words() {
        let fraction = keyword_overlap("machine learning is supervised", "supervised learning machine");
        assert!((fraction - 1.0).abs() < f64::EPSILON);

        let half = keyword_overlap("red green blue yellow", "green red");
        assert!((half - 0.5).abs() < f64::EPSILON);

        assert!(keyword_overlap("is a", "anything").abs() < f64::EPSILON);
    }
}
