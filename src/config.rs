// src/config.rs

use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct Config {
    // Database & API Keys
    pub database_url: Option<String>,
    pub gemini_api_key: Option<String>,

    // Server Config
    #[serde(default = "default_port")]
    pub port: u16,

    // Qdrant Config
    pub qdrant_url: Option<String>,
    #[serde(default = "default_tours_collection_name")]
    pub tours_collection_name: String,
    #[serde(default = "default_heritage_collection_name")]
    pub heritage_collection_name: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: u64,

    // Chunking Config (heritage guide documents)
    #[serde(default = "default_chunking_metric")]
    pub chunking_metric: String, // "char" or "word"
    #[serde(default = "default_chunking_max_size")]
    pub chunking_max_size: usize,
    #[serde(default = "default_chunking_overlap")]
    pub chunking_overlap: usize,

    // Object storage for heritage guide documents
    #[serde(default = "default_heritage_storage_path")]
    pub heritage_storage_path: String,

    // Model Configuration
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    // Retrieval defaults
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    // Controller limits
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "gemini_api_key",
                &self.gemini_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("port", &self.port)
            .field("qdrant_url", &self.qdrant_url.as_ref().map(|_| "[REDACTED]"))
            .field("tours_collection_name", &self.tours_collection_name)
            .field("heritage_collection_name", &self.heritage_collection_name)
            .field("embedding_dimension", &self.embedding_dimension)
            .field("chunking_metric", &self.chunking_metric)
            .field("chunking_max_size", &self.chunking_max_size)
            .field("chunking_overlap", &self.chunking_overlap)
            .field("heritage_storage_path", &self.heritage_storage_path)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("default_page_size", &self.default_page_size)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish()
    }
}

// Default value functions for serde
const fn default_port() -> u16 {
    8080
}
fn default_tours_collection_name() -> String {
    "tours".to_string()
}
fn default_heritage_collection_name() -> String {
    "tour-heritage-guides".to_string()
}
const fn default_embedding_dimension() -> u64 {
    768
} // Default for models/text-embedding-004
fn default_chunking_metric() -> String {
    "char".to_string()
}
const fn default_chunking_max_size() -> usize {
    1500
}
const fn default_chunking_overlap() -> usize {
    200
}
fn default_heritage_storage_path() -> String {
    "./heritage_guides".to_string()
}
fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_embedding_model() -> String {
    "models/text-embedding-004".to_string()
}
const fn default_page_size() -> u64 {
    10
}
const fn default_max_tool_rounds() -> usize {
    8
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `anyhow::Error` when a present variable fails to parse.
    /// Missing optional variables fall back to their serde defaults.
    pub fn load() -> Result<Self, anyhow::Error> {
        envy::from_env::<Self>().map_err(anyhow::Error::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            gemini_api_key: None,
            port: default_port(),
            qdrant_url: None,
            tours_collection_name: default_tours_collection_name(),
            heritage_collection_name: default_heritage_collection_name(),
            embedding_dimension: default_embedding_dimension(),
            chunking_metric: default_chunking_metric(),
            chunking_max_size: default_chunking_max_size(),
            chunking_overlap: default_chunking_overlap(),
            heritage_storage_path: default_heritage_storage_path(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            default_page_size: default_page_size(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_sane_chunking() {
        let config = Config::default();
        assert!(config.chunking_overlap < config.chunking_max_size);
        assert_eq!(config.chunking_metric, "char");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            gemini_api_key: Some("super-secret".to_string()),
            database_url: Some("postgres://user:pw@host/db".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("postgres://"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
