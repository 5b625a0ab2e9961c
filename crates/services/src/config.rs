use std::env;

use study_core::model::{StudySettings, StudySettingsDraft};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite:study.db?mode=rwc";

/// An HTTP collaborator: where to send requests and how to authenticate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: Url,
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub generation: Option<EndpointConfig>,
    pub analysis: Option<EndpointConfig>,
    pub database_url: String,
    pub settings: StudySettings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generation: None,
            analysis: None,
            database_url: DEFAULT_DB_URL.to_string(),
            settings: StudySettings::default(),
        }
    }
}

impl ServiceConfig {
    /// Read configuration from `STUDY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a URL or number cannot be parsed or the
    /// resulting settings are out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`ServiceConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = var("STUDY_API_KEY");
        let endpoint = |name: &'static str| -> Result<Option<EndpointConfig>, ConfigError> {
            var(name)
                .map(|raw| {
                    Url::parse(&raw)
                        .map(|url| EndpointConfig {
                            url,
                            api_key: api_key.clone(),
                        })
                        .map_err(|_| ConfigError::InvalidUrl {
                            var: name,
                            value: raw,
                        })
                })
                .transpose()
        };
        let number = |name: &'static str| -> Result<Option<u32>, ConfigError> {
            var(name)
                .map(|raw| {
                    raw.parse::<u32>()
                        .map_err(|_| ConfigError::InvalidNumber { var: name, value: raw })
                })
                .transpose()
        };

        let settings = StudySettingsDraft {
            words_per_minute: number("STUDY_WPM")?,
            page_size: number("STUDY_PAGE_SIZE")?,
            scoring: var("STUDY_SCORING"),
        }
        .validate()?;

        Ok(Self {
            generation: endpoint("STUDY_GENERATION_URL")?,
            analysis: endpoint("STUDY_ANALYSIS_URL")?,
            database_url: var("STUDY_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
            settings,
        })
    }
}
