use thiserror::Error;

/// Errors that can occur while extracting and saving a recipe
#[derive(Error, Debug)]
pub enum ExtractError {
    /// HTTP request failed
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// The recipe URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No metadata source returned a usable response
    #[error("Metadata fetch failed: {0}")]
    MetadataError(String),

    /// The canonical food vocabulary could not be loaded
    #[error("Failed to load food data: {0}")]
    VocabularyError(String),

    /// The recipe record could not be persisted
    #[error("Failed to save recipe: {0}")]
    StorageError(String),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}
