use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Language-model settings used for ingredient extraction
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Fuzzy matching settings
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Metadata provider settings
    #[serde(default)]
    pub opengraph: OpenGraphConfig,
    /// Vocabulary and recipe storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Title used when no metadata source provides one
    #[serde(default = "default_title")]
    pub default_title: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            matching: MatchingConfig::default(),
            opengraph: OpenGraphConfig::default(),
            storage: StorageConfig::default(),
            default_title: default_title(),
        }
    }
}

/// Configuration for the Gemini generateContent endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    /// API key (can also be set via GEMINI_API_KEY)
    pub api_key: Option<String>,
    /// Scheme and host of the API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// REST API version path segment
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Model resource names, tried first to last
    #[serde(default = "default_model_candidates")]
    pub model_candidates: Vec<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
    /// Maximum tokens to generate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            api_version: default_api_version(),
            model_candidates: default_model_candidates(),
            timeout_secs: default_gemini_timeout(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl GeminiConfig {
    /// API key from config, falling back to the GEMINI_API_KEY environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Configuration for mapping mentions onto the food vocabulary
#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Minimum similarity ratio for a match to be accepted
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Similarity metric name ("levenshtein" or "jaro_winkler")
    #[serde(default = "default_metric")]
    pub metric: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            metric: default_metric(),
        }
    }
}

/// Configuration for the OpenGraph.io metadata API
#[derive(Debug, Deserialize, Clone)]
pub struct OpenGraphConfig {
    /// App id (can also be set via OPENGRAPH_API_KEY)
    pub api_key: Option<String>,
    #[serde(default = "default_opengraph_base_url")]
    pub base_url: String,
    #[serde(default = "default_opengraph_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenGraphConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_opengraph_base_url(),
            timeout_secs: default_opengraph_timeout(),
        }
    }
}

impl OpenGraphConfig {
    /// App id from config, falling back to OPENGRAPH_API_KEY (whitespace stripped)
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENGRAPH_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Locations of the food vocabulary and saved recipes
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// JSON file holding the canonical food entries
    #[serde(default = "default_food_data_path")]
    pub food_data_path: String,
    /// Root directory for saved recipe records
    #[serde(default = "default_recipe_dir")]
    pub recipe_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            food_data_path: default_food_data_path(),
            recipe_dir: default_recipe_dir(),
        }
    }
}

// Default value functions
fn default_title() -> String {
    "레시피".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_model_candidates() -> Vec<String> {
    vec!["models/gemini-2.5-flash".to_string()]
}

fn default_gemini_timeout() -> u64 {
    15
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.1
}

fn default_similarity_threshold() -> f64 {
    0.4
}

fn default_metric() -> String {
    "levenshtein".to_string()
}

fn default_opengraph_base_url() -> String {
    "https://opengraph.io".to_string()
}

fn default_opengraph_timeout() -> u64 {
    30
}

fn default_food_data_path() -> String {
    "foodData.json".to_string()
}

fn default_recipe_dir() -> String {
    "data".to_string()
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with ROTTEN__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: ROTTEN__GEMINI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the source priority.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: ROTTEN__GEMINI__API_KEY
        .add_source(
            Environment::with_prefix("ROTTEN")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("gemini.model_candidates"),
        )
        .build()?;

    settings.try_deserialize()
}
