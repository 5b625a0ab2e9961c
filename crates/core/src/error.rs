use thiserror::Error;

use crate::model::{QuestionError, QuestionRangeError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    QuestionRange(#[from] QuestionRangeError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionRange;

    #[test]
    fn domain_errors_convert_transparently() {
        let inner = QuestionRange::new(30, 10).unwrap_err();
        let err: Error = inner.clone().into();
        assert!(matches!(err, Error::QuestionRange(_)));
        assert_eq!(err.to_string(), inner.to_string());
    }
}
