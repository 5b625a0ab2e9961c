use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest question count a range may ask for.
pub const MIN_QUESTIONS: u32 = 5;
/// Largest question count a range may ask for.
pub const MAX_QUESTIONS: u32 = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionRangeError {
    #[error("question range must stay within {MIN_QUESTIONS}..={MAX_QUESTIONS} (got {min}..={max})")]
    OutOfBounds { min: u32, max: u32 },

    #[error("minimum ({min}) cannot be greater than maximum ({max})")]
    Inverted { min: u32, max: u32 },
}

/// Inclusive bounds from which a generation run draws its question count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct QuestionRange {
    min: u32,
    max: u32,
}

#[derive(Deserialize)]
struct RawRange {
    min: u32,
    max: u32,
}

impl TryFrom<RawRange> for QuestionRange {
    type Error = QuestionRangeError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl QuestionRange {
    /// # Errors
    ///
    /// Returns `QuestionRangeError` when either bound leaves `5..=50` or `min > max`.
    pub fn new(min: u32, max: u32) -> Result<Self, QuestionRangeError> {
        if min > max {
            return Err(QuestionRangeError::Inverted { min, max });
        }
        if min < MIN_QUESTIONS || max > MAX_QUESTIONS {
            return Err(QuestionRangeError::OutOfBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// Suggested range for a text of `word_count` words: roughly one question
    /// per 150 words at the low end and one per 100 at the high end.
    #[must_use]
    pub fn suggested_for(word_count: usize) -> Self {
        let words = u32::try_from(word_count).unwrap_or(u32::MAX);
        let min = (words / 150).clamp(5, 15);
        let max = (words / 100).clamp(10, 35);
        Self { min, max }
    }

    #[must_use]
    pub fn min(&self) -> u32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }

    #[must_use]
    pub fn contains(&self, count: u32) -> bool {
        (self.min..=self.max).contains(&count)
    }
}
