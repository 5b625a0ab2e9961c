use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use study_core::scoring::ShortAnswerAssessment;

use crate::config::EndpointConfig;
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerAnalysis {
    pub assessment: ShortAnswerAssessment,
    pub feedback: String,
}

/// Grades free-text answers against the expected answer.
#[async_trait]
pub trait AnswerAnalyzer: Send + Sync {
    /// # Errors
    ///
    /// Returns `AnalysisError` when the analysis cannot be obtained.
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnswerAnalysis, AnalysisError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    score: f64,
    #[serde(default)]
    max_score: Option<f64>,
    #[serde(default)]
    feedback: String,
    is_correct: bool,
}

impl AnalysisResponse {
    fn into_analysis(self) -> AnswerAnalysis {
        let raw = match self.max_score {
            Some(max) if max > 0.0 => self.score / max,
            _ => self.score,
        };
        let score = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        AnswerAnalysis {
            assessment: ShortAnswerAssessment {
                score,
                is_correct: self.is_correct,
            },
            feedback: self.feedback.trim().to_string(),
        }
    }
}

/// `AnswerAnalyzer` backed by the HTTP analysis endpoint.
#[derive(Clone)]
pub struct HttpAnswerAnalyzer {
    client: Client,
    endpoint: Option<EndpointConfig>,
}

impl HttpAnswerAnalyzer {
    #[must_use]
    pub fn new(endpoint: Option<EndpointConfig>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl AnswerAnalyzer for HttpAnswerAnalyzer {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnswerAnalysis, AnalysisError> {
        let endpoint = self.endpoint.as_ref().ok_or(AnalysisError::Disabled)?;

        let mut builder = self.client.post(endpoint.url.clone()).json(&request);
        if let Some(key) = endpoint.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(AnalysisError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        serde_json::from_str::<AnalysisResponse>(&body)
            .map(AnalysisResponse::into_analysis)
            .map_err(|err| AnalysisError::Parse(err.to_string()))
    }
}
