use crate::model::{CanonicalFoodEntry, RecipeRecord};
use crate::ExtractError;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

/// Supplies the canonical food vocabulary for one extraction
#[async_trait]
pub trait FoodDataSource: Send + Sync {
    async fn load_food_data(&self) -> Result<Vec<CanonicalFoodEntry>, ExtractError>;
}

/// Persists extracted recipes per user
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Save the record and return its document id
    async fn save_recipe(&self, uid: &str, record: &RecipeRecord) -> Result<String, ExtractError>;
}

#[async_trait]
impl<T: RecipeStore + ?Sized> RecipeStore for Arc<T> {
    async fn save_recipe(&self, uid: &str, record: &RecipeRecord) -> Result<String, ExtractError> {
        (**self).save_recipe(uid, record).await
    }
}

/// Vocabulary kept in memory
#[derive(Debug, Clone, Default)]
pub struct StaticFoodData {
    entries: Vec<CanonicalFoodEntry>,
}

impl StaticFoodData {
    pub fn new(entries: Vec<CanonicalFoodEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl FoodDataSource for StaticFoodData {
    async fn load_food_data(&self) -> Result<Vec<CanonicalFoodEntry>, ExtractError> {
        Ok(self.entries.clone())
    }
}

/// Vocabulary read from a JSON array file on every load
#[derive(Debug, Clone)]
pub struct JsonFileFoodData {
    path: PathBuf,
}

impl JsonFileFoodData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FoodDataSource for JsonFileFoodData {
    async fn load_food_data(&self) -> Result<Vec<CanonicalFoodEntry>, ExtractError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ExtractError::VocabularyError(format!("{}: {}", self.path.display(), e))
        })?;

        let entries: Vec<CanonicalFoodEntry> = serde_json::from_str(&content).map_err(|e| {
            ExtractError::VocabularyError(format!("{}: {}", self.path.display(), e))
        })?;

        debug!("Loaded {} food entries from {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

/// Millisecond timestamp, process id and a per-store sequence number
fn document_id(sequence: u64) -> String {
    format!(
        "{}-{}-{:04}",
        chrono::Utc::now().format("%Y%m%d%H%M%S%3f"),
        std::process::id(),
        sequence
    )
}

/// Attempts before giving up on finding an unused file name
const MAX_ID_ATTEMPTS: usize = 8;

fn valid_uid(uid: &str) -> Result<&str, ExtractError> {
    let uid = uid.trim();
    if uid.is_empty() || uid.contains(|c: char| c == '/' || c == '\\') || uid == "." || uid == ".." {
        return Err(ExtractError::StorageError(format!("Invalid user id: {uid:?}")));
    }
    Ok(uid)
}

/// Writes records to `{root}/users/{uid}/recipeLog/{id}.json`
#[derive(Debug)]
pub struct JsonDirRecipeStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl JsonDirRecipeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn recipe_dir(&self, uid: &str) -> PathBuf {
        self.root.join("users").join(uid).join("recipeLog")
    }
}

#[async_trait]
impl RecipeStore for JsonDirRecipeStore {
    async fn save_recipe(&self, uid: &str, record: &RecipeRecord) -> Result<String, ExtractError> {
        let uid = valid_uid(uid)?;
        let dir = self.recipe_dir(uid);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ExtractError::StorageError(format!("{}: {}", dir.display(), e)))?;

        let json = serde_json::to_string_pretty(record)?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = document_id(self.sequence.fetch_add(1, Ordering::Relaxed));
            let path = dir.join(format!("{id}.json"));

            // Never overwrite an existing record
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!("Document {} already exists, picking another id", id);
                    continue;
                }
                Err(e) => {
                    return Err(ExtractError::StorageError(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                }
            };

            file.write_all(json.as_bytes())
                .await
                .map_err(|e| ExtractError::StorageError(format!("{}: {}", path.display(), e)))?;
            file.flush()
                .await
                .map_err(|e| ExtractError::StorageError(format!("{}: {}", path.display(), e)))?;

            info!("Saved recipe {} to {}", id, path.display());
            return Ok(id);
        }

        Err(ExtractError::StorageError(format!(
            "No unused document id in {} after {} attempts",
            dir.display(),
            MAX_ID_ATTEMPTS
        )))
    }
}

/// Keeps records in memory, keyed by user id
#[derive(Debug, Default)]
pub struct InMemoryRecipeStore {
    records: Mutex<HashMap<String, Vec<(String, RecipeRecord)>>>,
    sequence: AtomicU64,
}

impl InMemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saved records of one user, oldest first
    pub fn recipes(&self, uid: &str) -> Vec<(String, RecipeRecord)> {
        self.records
            .lock()
            .map(|records| records.get(uid).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    async fn save_recipe(&self, uid: &str, record: &RecipeRecord) -> Result<String, ExtractError> {
        let uid = valid_uid(uid)?;
        let id = document_id(self.sequence.fetch_add(1, Ordering::Relaxed));

        let mut records = self
            .records
            .lock()
            .map_err(|e| ExtractError::StorageError(e.to_string()))?;
        records
            .entry(uid.to_string())
            .or_default()
            .push((id.clone(), record.clone()));

        Ok(id)
    }
}
