mod fallback;
mod google;
mod prompt;

pub use fallback::{CandidateFailure, FallbackProvider};
pub use google::GeminiProvider;
pub use prompt::{build_extraction_prompt, INGREDIENT_EXTRACTION_PROMPT};

use async_trait::async_trait;
use thiserror::Error;

/// Why a single model attempt did not produce text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    #[error("request timed out")]
    Timeout,

    /// The model id is not served by this API version
    #[error("model not found (404): {body}")]
    ModelNotFound { body: String },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),

    #[error("response has no candidates")]
    EmptyCandidates,

    #[error("first candidate has no text part")]
    EmptyText,
}

/// A language-model backend serving one model
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "google")
    fn provider_name(&self) -> &str;

    /// Model identifier this provider calls
    fn model(&self) -> &str;

    /// Send the prompt and return the text of the first candidate
    async fn generate(&self, prompt: &str) -> Result<String, AttemptFailure>;
}
