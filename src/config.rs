use std::env;
use thiserror::Error;

/// Environment variable consulted when no base URL is configured.
pub const QDRANT_URL_ENV: &str = "QDRANT_BASE_URL";
/// Environment variable consulted when no API key is configured.
pub const QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

/// Errors raised while assembling a store or loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No embedder was supplied.
    #[error("invalid options: missing embedder")]
    MissingEmbedder,
    /// No collection name was supplied.
    #[error("invalid options: missing collection name")]
    MissingCollectionName,
    /// No base URL was supplied and the environment fallback was empty.
    #[error(
        "invalid options: missing api url. Pass it as an option or set the QDRANT_BASE_URL environment variable"
    )]
    MissingBaseUrl,
    /// Cloud deployment targeted without an API key.
    #[error(
        "invalid options: missing api key. Pass it as an option or set the QDRANT_API_KEY environment variable"
    )]
    MissingApiKey,
    /// Base URL failed to parse.
    #[error("invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings used by the command-line binary.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the Qdrant instance; the store builder falls back to the environment too.
    pub qdrant_url: Option<String>,
    /// Collection holding the documents.
    pub collection_name: String,
    /// Optional API key.
    pub api_key: Option<String>,
    /// Whether the target is a managed deployment requiring an API key.
    pub use_cloud: bool,
    /// Dimensionality of the local hash embedder and the provisioned collection.
    pub embedding_dimension: usize,
}

impl Settings {
    /// Load settings from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env_optional(QDRANT_URL_ENV),
            collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            api_key: load_env_optional(QDRANT_API_KEY_ENV),
            use_cloud: load_env_optional("QDRANT_USE_CLOUD")
                .map(|value| parse_bool(&value).ok_or_else(|| invalid("QDRANT_USE_CLOUD")))
                .transpose()?
                .unwrap_or(false),
            embedding_dimension: load_env_optional("EMBEDDING_DIMENSION")
                .map(|value| value.parse::<usize>().map_err(|_| invalid("EMBEDDING_DIMENSION")))
                .transpose()?
                .unwrap_or(1536),
        })
    }
}

/// Read `.env` (if present) into the process environment, then load [`Settings`].
pub fn init_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;
    tracing::debug!(
        qdrant_url = ?settings.qdrant_url,
        collection = %settings.collection_name,
        use_cloud = settings.use_cloud,
        embedding_dimension = settings.embedding_dimension,
        "Loaded settings"
    );
    Ok(settings)
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

/// Read an environment variable, treating blank values as absent.
pub(crate) fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(key: &str) -> ConfigError {
    ConfigError::InvalidValue(key.to_string())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
