use log::{debug, info, warn};

use crate::config::AppConfig;
use crate::ingredients::IngredientExtractor;
use crate::matcher::{metric_from_config, Similarity};
use crate::metadata::{HtmlMetaFetcher, MetadataChain, MetadataSource, OpenGraphClient};
use crate::model::CanonicalFoodEntry;
use crate::providers::FallbackProvider;
use crate::recipe::RecipeExtractor;
use crate::store::{FoodDataSource, JsonDirRecipeStore, JsonFileFoodData, RecipeStore, StaticFoodData};
use crate::ExtractError;
use std::time::Duration;

/// Builder for wiring a [`RecipeExtractor`]
///
/// Anything left unset is created from the configuration.
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    config: Option<AppConfig>,
    metadata_sources: Vec<Box<dyn MetadataSource>>,
    food_data: Option<Box<dyn FoodDataSource>>,
    store: Option<Box<dyn RecipeStore>>,
    model: Option<FallbackProvider>,
    similarity: Option<Box<dyn Similarity>>,
}

impl RecipeExtractorBuilder {
    /// Use this configuration instead of [`AppConfig::default`]
    ///
    /// # Example
    /// ```
    /// use rotten_recipe::{AppConfig, RecipeExtractor};
    ///
    /// let mut config = AppConfig::default();
    /// config.matching.similarity_threshold = 0.6;
    /// let builder = RecipeExtractor::builder().config(config);
    /// ```
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Add a metadata source. Sources are tried in the order they were
    /// added; adding any replaces the configured defaults.
    pub fn metadata_source(mut self, source: impl MetadataSource + 'static) -> Self {
        self.metadata_sources.push(Box::new(source));
        self
    }

    /// Set where the food vocabulary comes from
    pub fn food_data(mut self, source: impl FoodDataSource + 'static) -> Self {
        self.food_data = Some(Box::new(source));
        self
    }

    /// Match against a fixed vocabulary
    ///
    /// # Example
    /// ```
    /// use rotten_recipe::{CanonicalFoodEntry, RecipeExtractor};
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .vocabulary(vec![CanonicalFoodEntry::new("f1", "아보카도", "과일")]);
    /// ```
    pub fn vocabulary(self, entries: Vec<CanonicalFoodEntry>) -> Self {
        self.food_data(StaticFoodData::new(entries))
    }

    /// Set where extracted recipes are saved
    ///
    /// # Example
    /// ```
    /// use rotten_recipe::{InMemoryRecipeStore, RecipeExtractor};
    ///
    /// let builder = RecipeExtractor::builder().store(InMemoryRecipeStore::new());
    /// ```
    pub fn store(mut self, store: impl RecipeStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Use an already built model candidate chain
    pub fn model(mut self, model: FallbackProvider) -> Self {
        self.model = Some(model);
        self
    }

    /// Override the configured similarity metric
    ///
    /// # Example
    /// ```
    /// use rotten_recipe::matcher::JaroWinkler;
    /// use rotten_recipe::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder().similarity(JaroWinkler);
    /// ```
    pub fn similarity(mut self, metric: impl Similarity + 'static) -> Self {
        self.similarity = Some(Box::new(metric));
        self
    }

    /// Build the extractor
    ///
    /// # Errors
    /// Returns `ExtractError` if:
    /// - No model chain was given and no Gemini API key is configured
    /// - An HTTP client cannot be created
    pub fn build(self) -> Result<RecipeExtractor, ExtractError> {
        let config = self.config.unwrap_or_default();

        let metadata = if self.metadata_sources.is_empty() {
            default_metadata_sources(&config)?
        } else {
            self.metadata_sources
        };
        let metadata = MetadataChain::new(metadata);
        debug!("Metadata sources: {:?}", metadata.source_names());

        let food_data = self
            .food_data
            .unwrap_or_else(|| Box::new(JsonFileFoodData::new(&config.storage.food_data_path)));
        let store = self
            .store
            .unwrap_or_else(|| Box::new(JsonDirRecipeStore::new(&config.storage.recipe_dir)));

        let model = match self.model {
            Some(model) => model,
            None => FallbackProvider::new(&config.gemini)?,
        };
        let similarity = match self.similarity {
            Some(metric) => metric,
            None => metric_from_config(&config.matching),
        };
        info!(
            "Model candidates: {:?}, metric: {}, threshold: {}",
            model.models(),
            similarity.name(),
            config.matching.similarity_threshold
        );

        Ok(RecipeExtractor {
            metadata,
            food_data,
            store,
            ingredients: IngredientExtractor::new(
                model,
                similarity,
                config.matching.similarity_threshold,
            ),
            default_title: config.default_title,
        })
    }
}

/// OpenGraph.io when a key is available, then the page's own meta tags
fn default_metadata_sources(
    config: &AppConfig,
) -> Result<Vec<Box<dyn MetadataSource>>, ExtractError> {
    let mut sources: Vec<Box<dyn MetadataSource>> = Vec::new();

    if config.opengraph.resolve_api_key().is_some() {
        sources.push(Box::new(OpenGraphClient::new(&config.opengraph)?));
    } else {
        warn!("OPENGRAPH_API_KEY not set, reading page meta tags directly");
    }
    sources.push(Box::new(HtmlMetaFetcher::new(Some(Duration::from_secs(
        config.opengraph.timeout_secs,
    )))?));

    Ok(sources)
}
