use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use study_core::model::{QuestionDraft, QuestionRange};

use crate::config::EndpointConfig;
use crate::error::GenerationError;

/// Body sent to the generation service for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub text: String,
    pub question_range: QuestionRange,
    /// 0-based page index.
    pub page: u32,
    pub items_per_page: u32,
    pub total_questions: u32,
}

/// Produces question drafts for one page of a generation run.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GenerationError` when the service fails or its output cannot
    /// be read.
    async fn generate(&self, request: GenerationRequest)
    -> Result<Vec<QuestionDraft>, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    questions: Vec<QuestionDraft>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `QuestionGenerator` backed by the HTTP generation endpoint.
#[derive(Clone)]
pub struct HttpQuestionGenerator {
    client: Client,
    endpoint: Option<EndpointConfig>,
}

impl HttpQuestionGenerator {
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
impl QuestionGenerator for HttpQuestionGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let endpoint = self.endpoint.as_ref().ok_or(GenerationError::Disabled)?;

        let mut builder = self.client.post(endpoint.url.clone()).json(&request);
        if let Some(key) = endpoint.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|err| err.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(GenerationError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        parse_questions(&body)
    }
}

/// Parses a `{ "questions": [...] }` body.
///
/// Bodies wrapped in a Markdown code fence are accepted.
pub(crate) fn parse_questions(body: &str) -> Result<Vec<QuestionDraft>, GenerationError> {
    let trimmed = body.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str::<GenerationResponse>(unfenced.trim())
        .map(|response| response.questions)
        .map_err(|err| GenerationError::Parse(err.to_string()))
}
