//! Reading-time estimation for study text.

/// Average silent reading speed used when no setting overrides it.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

const MS_PER_MINUTE: u64 = 60_000;

#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes, expressed in milliseconds.
///
/// Empty text estimates to zero. A `words_per_minute` of zero falls back to
/// [`DEFAULT_WORDS_PER_MINUTE`].
#[must_use]
pub fn estimate_reading_ms(text: &str, words_per_minute: u32) -> u64 {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };
    let words = u64::try_from(count_words(text)).unwrap_or(u64::MAX);
    words.div_ceil(u64::from(wpm)).saturating_mul(MS_PER_MINUTE)
}

/// Formats seconds as `MM:SS`, or `H:MM:SS` from one hour up.
#[must_use]
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
