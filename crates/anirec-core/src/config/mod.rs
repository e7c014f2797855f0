//! Configuration management

pub mod selector;

pub use selector::{EmbeddingProvider, ModelProvider, VectorBackend};

use crate::error::{AnirecError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hosted language model providers
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model providers
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cloud vector index
    #[serde(default)]
    pub pinecone: PineconeConfig,

    /// Locally persisted vector index
    #[serde(default)]
    pub local_store: LocalStoreConfig,

    /// Web search used for enrichment
    #[serde(default)]
    pub web_search: WebSearchConfig,

    /// Pipeline sizing
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Settings for every supported chat model provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub groq: LlmProviderConfig,
    pub openai: LlmProviderConfig,
    pub gemini: LlmProviderConfig,
}

impl LlmConfig {
    pub fn provider(&self, provider: ModelProvider) -> &LlmProviderConfig {
        match provider {
            ModelProvider::Groq => &self.groq,
            ModelProvider::OpenAI => &self.openai,
            ModelProvider::Gemini => &self.gemini,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            groq: LlmProviderConfig::new(
                "https://api.groq.com/openai/v1",
                "llama-3.3-70b-versatile",
                "GROQ_API_KEY",
            ),
            openai: LlmProviderConfig::new("https://api.openai.com/v1", "gpt-4o-mini", "OPENAI_API_KEY"),
            gemini: LlmProviderConfig::new(
                "https://generativelanguage.googleapis.com/v1beta/openai",
                "gemini-2.5-flash-lite",
                "GOOGLE_API_KEY",
            ),
        }
    }
}

/// One OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Base URL, including the API version segment
    pub url: String,

    /// Model name for chat completions
    pub model: String,

    /// API key (required by every hosted provider)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmProviderConfig {
    fn new(url: &str, model: &str, key_var: &str) -> Self {
        Self {
            url: url.to_string(),
            model: model.to_string(),
            api_key: std::env::var(key_var).ok(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    2048
}

/// Settings for every supported embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub huggingface: EmbeddingProviderConfig,
    pub openai: EmbeddingProviderConfig,
}

impl EmbeddingConfig {
    pub fn provider(&self, provider: EmbeddingProvider) -> &EmbeddingProviderConfig {
        match provider {
            EmbeddingProvider::HuggingFace => &self.huggingface,
            EmbeddingProvider::OpenAI => &self.openai,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            huggingface: EmbeddingProviderConfig {
                url: "https://router.huggingface.co/hf-inference".to_string(),
                model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                api_key: std::env::var("HF_TOKEN")
                    .or_else(|_| std::env::var("HUGGINGFACEHUB_API_TOKEN"))
                    .ok(),
                dimensions: 384,
                timeout_secs: default_embed_timeout(),
            },
            openai: EmbeddingProviderConfig {
                url: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-3-small".to_string(),
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                dimensions: 1536,
                timeout_secs: default_embed_timeout(),
            },
        }
    }
}

/// One hosted embedding endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    pub url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub dimensions: usize,
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

fn default_embed_timeout() -> u64 {
    30
}

/// Pinecone data-plane connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// Index name (informational; the host addresses the index)
    pub index_name: String,

    /// Data-plane host, e.g. `https://anime-recommendation-v2-abc123.svc.aped-1234.pinecone.io`
    pub index_host: Option<String>,

    pub api_key: Option<String>,

    pub namespace: Option<String>,

    pub timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            index_name: std::env::var("PINECONE_INDEX_NAME")
                .unwrap_or_else(|_| "anime-recommendation-v2".to_string()),
            index_host: std::env::var("PINECONE_INDEX_HOST").ok(),
            api_key: std::env::var("PINECONE_API_KEY").ok(),
            namespace: std::env::var("PINECONE_NAMESPACE").ok(),
            timeout_secs: 20,
        }
    }
}

/// Locally persisted index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStoreConfig {
    pub path: PathBuf,
}

impl LocalStoreConfig {
    /// Default location of the local catalog index
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("catalog.sqlite")
    }
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            path: std::env::var("ANIREC_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::default_path()),
        }
    }
}

/// Web search used to enrich retrieved titles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// Results requested per title
    pub max_results: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum in-flight search requests
    pub concurrency: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            url: "https://api.tavily.com/search".to_string(),
            api_key: std::env::var("TAVILY_API_KEY").ok(),
            max_results: 3,
            timeout_secs: 15,
            concurrency: 5,
        }
    }
}

/// Pipeline sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Catalog matches retrieved per request
    pub retrieval_k: usize,
    /// Recommendations returned per request
    pub recommendation_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 8,
            recommendation_count: 5,
        }
    }
}

impl Config {
    /// Load config from `ANIREC_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("ANIREC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        Self::load_from(&path)
    }

    /// Load config from a specific file, falling back to defaults if absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Reject sizes the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("pipeline.retrieval_k", self.pipeline.retrieval_k),
            ("pipeline.recommendation_count", self.pipeline.recommendation_count),
            ("web_search.max_results", self.web_search.max_results),
            ("web_search.concurrency", self.web_search.concurrency),
        ];
        match sizes.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(AnirecError::Config(format!("{} must be at least 1", name))),
            None => Ok(()),
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Copy of the config with every API key masked, for display
    pub fn redacted(&self) -> Config {
        fn mask(key: &mut Option<String>) {
            if key.is_some() {
                *key = Some("********".to_string());
            }
        }

        let mut config = self.clone();
        mask(&mut config.llm.groq.api_key);
        mask(&mut config.llm.openai.api_key);
        mask(&mut config.llm.gemini.api_key);
        mask(&mut config.embedding.huggingface.api_key);
        mask(&mut config.embedding.openai.api_key);
        mask(&mut config.pinecone.api_key);
        mask(&mut config.web_search.api_key);
        config
    }
}
