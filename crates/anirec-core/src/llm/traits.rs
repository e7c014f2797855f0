//! Provider capability traits

use super::{ChatMessage, MetricsSnapshot};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch.pop().ok_or_else(|| {
            crate::error::AnirecError::ExternalError("No embedding returned".to_string())
        })
    }

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Request counters, for embedders that keep them
    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// Chat model able to answer in a caller-supplied JSON shape
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run a chat completion constrained to `schema` and return the parsed JSON object
    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &OutputSchema,
    ) -> Result<Value>;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Request counters, for clients that keep them
    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}

/// Named JSON Schema describing a structured model output
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

impl OutputSchema {
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }

    /// `response_format` body for OpenAI-compatible endpoints
    pub fn response_format(&self) -> Value {
        serde_json::json!({
            "type": "json_schema",
            "json_schema": {
                "name": self.name,
                "schema": self.schema,
                "strict": true
            }
        })
    }
}
