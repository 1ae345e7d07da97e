//! Application settings
//!
//! Settings are layered: built-in defaults, then an optional JSON settings
//! file, then whatever the binary overrides from the environment and CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;
use url::Url;

use crate::error::{AgendaError, Result};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Embedding provider configuration (OpenAI-compatible API)
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Base URL of the API, e.g. "https://models.inference.ai.azure.com"
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name
    pub model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://models.inference.ai.azure.com".to_string(),
            api_key: None,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

/// Qdrant connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QdrantSettings {
    /// REST endpoint, e.g. "http://qdrant:6333"
    pub url: String,
    /// Collection holding the agenda points
    pub collection: String,
    /// Vector size used when the collection has to be created
    pub vector_size: u64,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: "http://qdrant:6333".to_string(),
            collection: "codemotion".to_string(),
            vector_size: 3072,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Path of the MCP endpoint
    pub path: String,
    /// Server name reported during initialization
    pub name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            path: "/mcp".to_string(),
            name: "Codemotion MCP Server".to_string(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    pub embeddings: EmbeddingSettings,
    pub qdrant: QdrantSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self {
            version: 1,
            embeddings: EmbeddingSettings::default(),
            qdrant: QdrantSettings::default(),
            server: ServerSettings::default(),
        }
    }

    /// Load settings from a JSON file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        // Write atomically using temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, path).await?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Check that endpoints parse and required values are present
    pub fn validate(&self) -> Result<()> {
        parse_endpoint("embeddings.baseUrl", &self.embeddings.base_url)?;
        parse_endpoint("qdrant.url", &self.qdrant.url)?;

        if self.embeddings.model.trim().is_empty() {
            return Err(AgendaError::Config("embeddings.model is empty".to_string()));
        }
        if self.qdrant.collection.trim().is_empty() {
            return Err(AgendaError::Config("qdrant.collection is empty".to_string()));
        }
        if self.qdrant.vector_size == 0 {
            return Err(AgendaError::Config("qdrant.vectorSize must be positive".to_string()));
        }
        if !self.server.path.starts_with('/') {
            return Err(AgendaError::Config(format!(
                "server.path must start with '/': {}",
                self.server.path
            )));
        }
        Ok(())
    }
}

/// Parse an http(s) endpoint URL
pub(crate) fn parse_endpoint(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| AgendaError::Config(format!("{} is not a valid URL ({}): {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AgendaError::Config(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}
