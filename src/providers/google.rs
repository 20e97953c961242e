use crate::config::GeminiConfig;
use crate::providers::{AttemptFailure, LlmProvider};
use crate::{truncate_for_log, ExtractError};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Response bodies are cut to this many characters before being logged or
/// carried inside an [`AttemptFailure`].
const LOGGED_BODY_CHARS: usize = 2000;

/// Calls one Gemini model through the REST `generateContent` endpoint
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a provider for `model` (a resource name such as
    /// `models/gemini-2.5-flash`) from configuration
    pub fn new(config: &GeminiConfig, model: impl Into<String>) -> Result<Self, ExtractError> {
        // Try config first, then fall back to environment variable
        let api_key = config.resolve_api_key().ok_or_else(|| {
            ExtractError::BuilderError("GEMINI_API_KEY not found in config or environment".into())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(GeminiProvider {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            model: model.into(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Endpoint URL without the key parameter
    fn endpoint(&self) -> String {
        format!(
            "{}/{}/{}:generateContent",
            self.base_url, self.api_version, self.model
        )
    }
}

fn transport_failure(error: reqwest::Error) -> AttemptFailure {
    if error.is_timeout() {
        AttemptFailure::Timeout
    } else {
        AttemptFailure::Transport(error.to_string())
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, AttemptFailure> {
        let url = Url::parse_with_params(&self.endpoint(), &[("key", self.api_key.as_str())])
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&json!({
                "generationConfig": {
                    "maxOutputTokens": self.max_output_tokens,
                    "temperature": self.temperature
                },
                "contents": [{
                    "parts": [{
                        "text": prompt
                    }]
                }]
            }))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;
        debug!(
            "Gemini response: model={}, status={}, body={}",
            self.model,
            status,
            truncate_for_log(&body, LOGGED_BODY_CHARS)
        );

        if status == StatusCode::NOT_FOUND {
            return Err(AttemptFailure::ModelNotFound {
                body: truncate_for_log(&body, LOGGED_BODY_CHARS),
            });
        }
        if !status.is_success() {
            return Err(AttemptFailure::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, LOGGED_BODY_CHARS),
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| AttemptFailure::MalformedEnvelope(e.to_string()))?;

        let first = envelope
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .ok_or(AttemptFailure::EmptyCandidates)?;

        let text = first
            .content
            .and_then(|content| content.parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AttemptFailure::EmptyText)?;

        Ok(text)
    }
}
