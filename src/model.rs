use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// An entry of the canonical food vocabulary. `name` is the matching key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFoodEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

impl CanonicalFoodEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
        }
    }
}

/// A single ingredient occurrence as reported by the language model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawIngredientMention {
    pub name: String,
    pub amount: Option<Number>,
    pub unit: String,
}

impl RawIngredientMention {
    /// Read a mention out of one element of the model's JSON array.
    ///
    /// Returns `None` for non-object elements and for missing, non-string
    /// or blank names.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        let name = object.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }

        let amount = match object.get("amount") {
            Some(Value::Number(n)) => Some(n.clone()),
            // Models occasionally quote numbers ("2", "0.5")
            Some(Value::String(s)) => parse_quoted_amount(s.trim()),
            _ => None,
        };

        let unit = object
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            name: name.to_string(),
            amount,
            unit,
        })
    }
}

/// Integers stay integers so `"2"` serializes as `2`, not `2.0`
fn parse_quoted_amount(s: &str) -> Option<Number> {
    if let Ok(n) = s.parse::<u64>() {
        return Some(Number::from(n));
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Number::from(n));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// A mention that was accepted against the vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIngredient {
    /// Always the exact `name` of a vocabulary entry
    pub standard_name: String,
    pub food_id: String,
    pub category: String,
    pub amount: Option<Number>,
    pub unit: String,
}

/// Lifecycle state of a saved recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeStatus {
    #[default]
    Planned,
}

/// The document persisted for each extracted recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub original_url: String,
    pub title: String,
    pub thumbnail: String,
    pub source_name: String,
    pub ai_extracted_ingredients: Vec<NormalizedIngredient>,
    /// User-confirmed ingredients; starts as a copy of the extracted list
    pub final_ingredients: Vec<NormalizedIngredient>,
    pub status: RecipeStatus,
    pub created_at: DateTime<Utc>,
}

impl RecipeRecord {
    pub fn new(
        original_url: impl Into<String>,
        title: impl Into<String>,
        thumbnail: impl Into<String>,
        source_name: impl Into<String>,
        ai_extracted_ingredients: Vec<NormalizedIngredient>,
    ) -> Self {
        Self {
            original_url: original_url.into(),
            title: title.into(),
            thumbnail: thumbnail.into(),
            source_name: source_name.into(),
            final_ingredients: ai_extracted_ingredients.clone(),
            ai_extracted_ingredients,
            status: RecipeStatus::Planned,
            created_at: Utc::now(),
        }
    }
}

/// Result of a full URL extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRecipe {
    pub document_id: String,
    pub title: String,
    pub thumbnail: String,
    pub source_name: String,
    pub ingredients: Vec<NormalizedIngredient>,
}
