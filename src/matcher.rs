use crate::config::MatchingConfig;
use crate::model::{CanonicalFoodEntry, NormalizedIngredient, RawIngredientMention};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;

/// Normalized string similarity in `[0, 1]`, where 1.0 means identical
pub trait Similarity: Send + Sync {
    fn name(&self) -> &'static str;

    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// `1 - levenshtein / max(len)`, counted in chars
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn name(&self) -> &'static str {
        "jaro_winkler"
    }

    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }
}

/// Look up a metric by its configured name
pub fn metric_by_name(name: &str) -> Option<Box<dyn Similarity>> {
    match name.trim().to_lowercase().as_str() {
        "levenshtein" | "normalized_levenshtein" => Some(Box::new(NormalizedLevenshtein)),
        "jaro_winkler" | "jaro-winkler" => Some(Box::new(JaroWinkler)),
        _ => None,
    }
}

/// The configured metric, falling back to [`NormalizedLevenshtein`] for
/// unknown names
pub fn metric_from_config(config: &MatchingConfig) -> Box<dyn Similarity> {
    match metric_by_name(&config.metric) {
        Some(metric) => metric,
        None => {
            warn!(
                "Unknown similarity metric '{}', using levenshtein",
                config.metric
            );
            Box::new(NormalizedLevenshtein)
        }
    }
}

/// The single best name scoring at least `threshold`. Ties keep the
/// earlier name.
pub fn closest_match<'a, I>(
    metric: &dyn Similarity,
    query: &str,
    names: I,
    threshold: f64,
) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;

    for name in names {
        let score = metric.ratio(query, name);
        if score < threshold {
            continue;
        }
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((name, score));
        }
    }

    best.map(|(name, _)| name)
}

/// Maps model mentions onto a canonical food vocabulary
pub struct IngredientMatcher<'v> {
    /// Trimmed names in vocabulary order
    names: Vec<&'v str>,
    entries: HashMap<&'v str, &'v CanonicalFoodEntry>,
    metric: &'v dyn Similarity,
    threshold: f64,
}

impl<'v> IngredientMatcher<'v> {
    /// Index the vocabulary. Entries with blank names are ignored and the
    /// first entry wins when names repeat.
    pub fn new(
        vocabulary: &'v [CanonicalFoodEntry],
        metric: &'v dyn Similarity,
        threshold: f64,
    ) -> Self {
        let mut names = Vec::with_capacity(vocabulary.len());
        let mut entries = HashMap::with_capacity(vocabulary.len());

        for entry in vocabulary {
            let name = entry.name.trim();
            if name.is_empty() || entries.contains_key(name) {
                continue;
            }
            names.push(name);
            entries.insert(name, entry);
        }

        Self {
            names,
            entries,
            metric,
            threshold,
        }
    }

    /// Number of distinct names available for matching
    pub fn vocabulary_size(&self) -> usize {
        self.names.len()
    }

    /// Match one mention, or `None` when nothing clears the threshold
    pub fn match_mention(&self, mention: &RawIngredientMention) -> Option<NormalizedIngredient> {
        let best = closest_match(
            self.metric,
            &mention.name,
            self.names.iter().copied(),
            self.threshold,
        )?;
        let entry = self.entries.get(best)?;

        Some(NormalizedIngredient {
            standard_name: entry.name.clone(),
            food_id: entry.id.clone(),
            category: entry.category.clone(),
            amount: mention.amount.clone(),
            unit: mention.unit.clone(),
        })
    }

    /// Normalize raw array elements in order. Malformed elements and
    /// unmatched mentions are dropped.
    pub fn normalize(&self, raw: &[Value]) -> Vec<NormalizedIngredient> {
        let normalized: Vec<NormalizedIngredient> = raw
            .iter()
            .filter_map(RawIngredientMention::from_value)
            .filter_map(|mention| self.match_mention(&mention))
            .collect();

        debug!(
            "Matched {} of {} mentions using {} (threshold {})",
            normalized.len(),
            raw.len(),
            self.metric.name(),
            self.threshold
        );
        normalized
    }
}
