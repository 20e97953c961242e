use crate::builder::RecipeExtractorBuilder;
use crate::config::AppConfig;
use crate::ingredients::IngredientExtractor;
use crate::metadata::{MetadataChain, PageMetadata, ResolvedMetadata};
use crate::model::{ExtractedRecipe, NormalizedIngredient, RecipeRecord};
use crate::store::{FoodDataSource, RecipeStore};
use crate::ExtractError;
use log::{info, warn};
use reqwest::Url;

/// Turns a recipe URL into a saved recipe with normalized ingredients
pub struct RecipeExtractor {
    pub(crate) metadata: MetadataChain,
    pub(crate) food_data: Box<dyn FoodDataSource>,
    pub(crate) store: Box<dyn RecipeStore>,
    pub(crate) ingredients: IngredientExtractor,
    pub(crate) default_title: String,
}

impl RecipeExtractor {
    /// Creates a new builder for wiring an extractor
    ///
    /// # Example
    /// ```
    /// use rotten_recipe::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder();
    /// ```
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::default()
    }

    /// Extractor with every collaborator taken from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        Self::builder().config(config.clone()).build()
    }

    /// Fetch metadata for `url`, extract its ingredients and save the
    /// recipe for user `uid`.
    ///
    /// Metadata and model failures degrade to defaults; vocabulary and
    /// storage failures are returned.
    pub async fn extract(&self, url: &str, uid: &str) -> Result<ExtractedRecipe, ExtractError> {
        let url = url.trim();
        Url::parse(url).map_err(|e| ExtractError::InvalidUrl(format!("{url}: {e}")))?;

        info!("Step 1: fetching metadata for {}", url);
        let metadata = match self.metadata.fetch(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Continuing with empty metadata: {}", e);
                PageMetadata::default()
            }
        };
        let resolved = ResolvedMetadata::resolve(&metadata, url, &self.default_title);
        info!(
            "Resolved title={:?}, source_name={:?}, thumbnail={}",
            resolved.title,
            resolved.source_name,
            !resolved.thumbnail.is_empty()
        );

        info!("Step 2: extracting ingredients");
        let ingredients = if resolved.analysis_text.is_empty() {
            warn!("No description or title to analyze for {}", url);
            Vec::new()
        } else {
            self.extract_ingredients(&resolved.analysis_text).await?
        };

        info!("Step 3: saving recipe for user {}", uid);
        let record = RecipeRecord::new(
            url,
            resolved.title.clone(),
            resolved.thumbnail.clone(),
            resolved.source_name.clone(),
            ingredients.clone(),
        );
        let document_id = self.store.save_recipe(uid, &record).await?;

        Ok(ExtractedRecipe {
            document_id,
            title: resolved.title,
            thumbnail: resolved.thumbnail,
            source_name: resolved.source_name,
            ingredients,
        })
    }

    /// Run the ingredient pipeline on free text against a freshly loaded
    /// vocabulary
    pub async fn extract_ingredients(
        &self,
        text: &str,
    ) -> Result<Vec<NormalizedIngredient>, ExtractError> {
        let vocabulary = self.food_data.load_food_data().await?;
        if vocabulary.is_empty() {
            warn!("Food vocabulary is empty, no mention can match");
        }

        Ok(self.ingredients.extract_ingredients(text, &vocabulary).await)
    }
}
