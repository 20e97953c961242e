use crate::config::AppConfig;
use crate::matcher::{metric_from_config, IngredientMatcher, Similarity};
use crate::model::{CanonicalFoodEntry, NormalizedIngredient};
use crate::providers::{build_extraction_prompt, FallbackProvider};
use crate::recovery::parse_mentions;
use crate::ExtractError;
use log::{debug, info};

/// Text → prompt → model → recovered array → vocabulary matches.
///
/// Holds only immutable configuration, so one extractor can serve
/// concurrent requests.
pub struct IngredientExtractor {
    model: FallbackProvider,
    metric: Box<dyn Similarity>,
    threshold: f64,
}

impl IngredientExtractor {
    pub fn new(model: FallbackProvider, metric: Box<dyn Similarity>, threshold: f64) -> Self {
        Self {
            model,
            metric,
            threshold,
        }
    }

    /// Build the model chain and matcher settings from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        let model = FallbackProvider::new(&config.gemini)?;
        let metric = metric_from_config(&config.matching);

        Ok(Self::new(model, metric, config.matching.similarity_threshold))
    }

    /// Extract ingredients from `text` and normalize them against
    /// `vocabulary`. Model failures and unparseable output give an empty list.
    pub async fn extract_ingredients(
        &self,
        text: &str,
        vocabulary: &[CanonicalFoodEntry],
    ) -> Vec<NormalizedIngredient> {
        if text.trim().is_empty() {
            debug!("No text to analyze, skipping model call");
            return Vec::new();
        }

        let prompt = build_extraction_prompt(text);
        let response = self.model.generate_or_empty(&prompt).await;
        let response = response.trim();
        if response.is_empty() {
            return Vec::new();
        }

        let mentions = parse_mentions(response);
        let matcher = IngredientMatcher::new(vocabulary, self.metric.as_ref(), self.threshold);
        let ingredients = matcher.normalize(&mentions);

        info!(
            "Extracted {} mentions, {} matched against {} food entries",
            mentions.len(),
            ingredients.len(),
            matcher.vocabulary_size()
        );
        ingredients
    }
}
