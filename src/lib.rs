pub mod builder;
pub mod config;
pub mod error;
pub mod ingredients;
pub mod matcher;
pub mod metadata;
pub mod model;
pub mod providers;
pub mod recipe;
pub mod recovery;
pub mod store;

// Re-export commonly used types
pub use builder::RecipeExtractorBuilder;
pub use config::AppConfig;
pub use error::ExtractError;
pub use ingredients::IngredientExtractor;
pub use model::{
    CanonicalFoodEntry, ExtractedRecipe, NormalizedIngredient, RecipeRecord, RecipeStatus,
};
pub use recipe::RecipeExtractor;
pub use store::{
    FoodDataSource, InMemoryRecipeStore, JsonDirRecipeStore, JsonFileFoodData, RecipeStore,
    StaticFoodData,
};

/// Extract and save a recipe using configuration from `config.toml` and
/// the environment
///
/// # Arguments
/// * `url` - The recipe post URL
/// * `uid` - The user the recipe is saved for
///
/// # Returns
/// The saved recipe's document id, resolved metadata and ingredients
pub async fn extract_recipe(url: &str, uid: &str) -> Result<ExtractedRecipe, ExtractError> {
    let config = AppConfig::load()?;
    RecipeExtractor::from_config(&config)?.extract(url, uid).await
}

/// Extract ingredients from free text and match them against
/// `vocabulary`, using the configured model candidates and metric
///
/// Model failures give an empty list rather than an error.
pub async fn extract_ingredients(
    text: &str,
    vocabulary: &[CanonicalFoodEntry],
) -> Result<Vec<NormalizedIngredient>, ExtractError> {
    let config = AppConfig::load()?;
    let extractor = IngredientExtractor::from_config(&config)?;
    Ok(extractor.extract_ingredients(text, vocabulary).await)
}

/// At most `max_chars` characters of `s`, marking the cut
pub(crate) fn truncate_for_log(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
