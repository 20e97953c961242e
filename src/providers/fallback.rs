use crate::config::GeminiConfig;
use crate::providers::{AttemptFailure, GeminiProvider, LlmProvider};
use crate::ExtractError;
use log::{debug, error, info, warn};

/// One failed candidate, kept for diagnosis
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub model: String,
    pub failure: AttemptFailure,
}

/// Tries model candidates in priority order until one answers.
///
/// Each candidate gets exactly one attempt; calls are sequential.
pub struct FallbackProvider {
    providers: Vec<Box<dyn LlmProvider>>,
}

impl FallbackProvider {
    /// Create one Gemini provider per configured model candidate
    pub fn new(config: &GeminiConfig) -> Result<Self, ExtractError> {
        let mut providers: Vec<Box<dyn LlmProvider>> = Vec::new();

        for model in &config.model_candidates {
            let provider = GeminiProvider::new(config, model.clone())?;
            debug!("Added '{}' to model candidates", model);
            providers.push(Box::new(provider));
        }

        Self::from_providers(providers)
    }

    /// Build a chain from already constructed providers
    pub fn from_providers(providers: Vec<Box<dyn LlmProvider>>) -> Result<Self, ExtractError> {
        if providers.is_empty() {
            return Err(ExtractError::BuilderError(
                "No model candidates configured".to_string(),
            ));
        }

        Ok(FallbackProvider { providers })
    }

    /// Model identifiers in the order they are tried
    pub fn models(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.model()).collect()
    }

    /// Return the first successful answer, or every candidate's failure
    pub async fn try_each(&self, prompt: &str) -> Result<String, Vec<CandidateFailure>> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(text) => {
                    info!(
                        "Model call succeeded: provider={}, model={}",
                        provider.provider_name(),
                        provider.model()
                    );
                    return Ok(text);
                }
                Err(failure) => {
                    warn!(
                        "Model call failed: provider={}, model={}, error={}",
                        provider.provider_name(),
                        provider.model(),
                        failure
                    );
                    failures.push(CandidateFailure {
                        model: provider.model().to_string(),
                        failure,
                    });
                }
            }
        }

        Err(failures)
    }

    /// Like [`try_each`](Self::try_each), but exhaustion yields an empty string
    pub async fn generate_or_empty(&self, prompt: &str) -> String {
        match self.try_each(prompt).await {
            Ok(text) => text,
            Err(failures) => {
                let last = failures
                    .last()
                    .map(|f| f.failure.to_string())
                    .unwrap_or_default();
                error!(
                    "All model candidates failed: candidates={:?}, last_error={}",
                    self.models(),
                    last
                );
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedProvider {
        model: String,
        answer: Result<String, AttemptFailure>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            &self.model
        }

        async fn generate(&self, _prompt: &str) -> Result<String, AttemptFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn scripted(
        model: &str,
        answer: Result<&str, AttemptFailure>,
        calls: &Arc<AtomicUsize>,
    ) -> Box<dyn LlmProvider> {
        Box::new(ScriptedProvider {
            model: model.to_string(),
            answer: answer.map(str::to_string),
            calls: Arc::clone(calls),
        })
    }

    /// Keeps every log line so tests can check what was reported
    struct CapturingLogger;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static LOGGER: CapturingLogger = CapturingLogger;

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut lines) = CAPTURED.lock() {
                lines.push(format!("{} {}", record.level(), record.args()));
            }
        }

        fn flush(&self) {}
    }

    fn captured_lines_containing(needle: &str) -> Vec<String> {
        CAPTURED
            .lock()
            .map(|lines| lines.iter().filter(|l| l.contains(needle)).cloned().collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_each_failure_is_logged_with_model_id() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);

        let calls = Arc::new(AtomicUsize::new(0));
        let fallback = FallbackProvider::from_providers(vec![
            scripted(
                "models/logged-first",
                Err(AttemptFailure::ModelNotFound {
                    body: "not found".to_string(),
                }),
                &calls,
            ),
            scripted("models/logged-second", Err(AttemptFailure::Timeout), &calls),
        ])
        .unwrap();

        assert_eq!(fallback.generate_or_empty("prompt").await, "");

        let first = captured_lines_containing("model=models/logged-first,");
        assert_eq!(first.len(), 1);
        assert!(first[0].starts_with("WARN"));
        assert!(first[0].contains("model not found"));

        let second = captured_lines_containing("model=models/logged-second,");
        assert_eq!(second.len(), 1);
        assert!(second[0].contains("request timed out"));

        let summary = captured_lines_containing("All model candidates failed");
        assert_eq!(summary.len(), 1);
        assert!(summary[0].starts_with("ERROR"));
        assert!(summary[0].contains("models/logged-first"));
        assert!(summary[0].contains("models/logged-second"));
    }

    #[test]
    fn test_one_provider_per_candidate() {
        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            model_candidates: vec!["models/a".to_string(), "models/b".to_string()],
            ..GeminiConfig::default()
        };

        let fallback = FallbackProvider::new(&config).unwrap();
        assert_eq!(fallback.models(), vec!["models/a", "models/b"]);
    }

    #[test]
    fn test_no_candidates() {
        let result = FallbackProvider::from_providers(Vec::new());
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("No model candidates"));
        }
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_success() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let fallback = FallbackProvider::from_providers(vec![
            scripted("models/a", Ok("[]"), &first),
            scripted("models/b", Ok("unused"), &second),
        ])
        .unwrap();

        assert_eq!(fallback.try_each("prompt").await.unwrap(), "[]");
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_through_without_retrying() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let fallback = FallbackProvider::from_providers(vec![
            scripted("models/a", Err(AttemptFailure::Timeout), &first),
            scripted("models/b", Ok("[{\"name\": \"사과\"}]"), &second),
        ])
        .unwrap();

        let text = fallback.try_each("prompt").await.unwrap();
        assert!(text.contains("사과"));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_collects_every_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fallback = FallbackProvider::from_providers(vec![
            scripted(
                "models/a",
                Err(AttemptFailure::ModelNotFound {
                    body: "not found".to_string(),
                }),
                &calls,
            ),
            scripted("models/b", Err(AttemptFailure::EmptyCandidates), &calls),
        ])
        .unwrap();

        let failures = fallback.try_each("prompt").await.unwrap_err();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].model, "models/a");
        assert_eq!(failures[1].model, "models/b");
        assert_eq!(failures[1].failure, AttemptFailure::EmptyCandidates);

        assert_eq!(fallback.generate_or_empty("prompt").await, "");
    }
}
