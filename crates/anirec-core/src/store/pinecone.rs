//! Pinecone serverless index over its REST data plane

use super::VectorStore;
use crate::config::{PineconeConfig, VectorBackend};
use crate::error::{AnirecError, Result};
use crate::llm::Embedder;
use crate::schema::{CatalogMatch, CatalogMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

const API_VERSION: &str = "2024-07";

/// Connected Pinecone index
pub struct PineconeStore {
    http_client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    index_name: String,
    embedder: Arc<dyn Embedder>,
}

impl PineconeStore {
    /// Connect to the configured index and check it matches the embedder
    pub async fn connect(config: &PineconeConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let resource = format!("Pinecone index '{}'", config.index_name);

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnirecError::unavailable(&resource, "PINECONE_API_KEY not set"))?;
        let host = config
            .index_host
            .as_deref()
            .map(normalize_host)
            .ok_or_else(|| AnirecError::unavailable(&resource, "PINECONE_INDEX_HOST not set"))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnirecError::unavailable(&resource, e.to_string()))?;

        let store = Self {
            http_client,
            host,
            api_key,
            namespace: config.namespace.clone(),
            index_name: config.index_name.clone(),
            embedder,
        };

        tracing::info!("Connecting to Pinecone index '{}'...", store.index_name);
        let dimension = store
            .index_dimension()
            .await
            .map_err(|e| AnirecError::unavailable(&resource, e.to_string()))?;

        if let Some(dimension) = dimension {
            if dimension != store.embedder.dimensions() {
                return Err(AnirecError::unavailable(
                    &resource,
                    format!(
                        "index dimension {} does not match {} ({} dimensions)",
                        dimension,
                        store.embedder.model_name(),
                        store.embedder.dimensions()
                    ),
                ));
            }
        }
        tracing::info!("Pinecone connection established");

        Ok(store)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn index_dimension(&self) -> Result<Option<usize>> {
        #[derive(Deserialize)]
        struct IndexStats {
            #[serde(default)]
            dimension: Option<usize>,
        }

        let response = self
            .post("/describe_index_stats")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let stats: IndexStats = error_for_status(response).await?.json().await?;
        Ok(stats.dimension)
    }

    /// Query the index with an already-embedded vector
    pub async fn query_vector(&self, vector: Vec<f32>, k: usize) -> Result<Vec<CatalogMatch>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct QueryRequest<'a> {
            vector: Vec<f32>,
            top_k: usize,
            include_metadata: bool,
            include_values: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            namespace: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct QueryResponse {
            #[serde(default)]
            matches: Vec<QueryMatch>,
        }

        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response = self.post("/query").json(&request).send().await?;
        let body: QueryResponse = error_for_status(response).await?.json().await?;

        Ok(body
            .matches
            .into_iter()
            .take(k)
            .map(QueryMatch::into_catalog_match)
            .collect())
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<CatalogMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        self.query_vector(vector, k).await
    }

    fn backend(&self) -> VectorBackend {
        VectorBackend::Pinecone
    }
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl QueryMatch {
    fn into_catalog_match(self) -> CatalogMatch {
        let field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| self.metadata.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        // LangChain writes the embedded text under "text"
        let content = field(&["text", "content", "page_content"]).unwrap_or_default();
        let title = field(&["title", "Name", "name"])
            .or_else(|| title_from_content(&content))
            .unwrap_or_else(|| self.id.clone());

        let mut metadata = CatalogMetadata::from_json_map(&self.metadata);
        if metadata.id.is_none() {
            metadata.id = Some(self.id.clone());
        }

        CatalogMatch {
            title,
            content,
            metadata,
            similarity: self.score,
        }
    }
}

fn title_from_content(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("Title:"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AnirecError::ExternalError(format!(
        "Pinecone error (HTTP {}): {}",
        status, body
    )))
}
