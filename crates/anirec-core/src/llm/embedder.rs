//! Hosted embedding models (Hugging Face inference, OpenAI)

use super::cache::{embedding_cache_key, ResponseCache};
use super::client::APIMetrics;
use super::{Embedder, MetricsSnapshot};
use crate::config::{EmbeddingConfig, EmbeddingProvider, EmbeddingProviderConfig};
use crate::error::{AnirecError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// Build the embedder for a selector
pub fn embedder_for(
    provider: EmbeddingProvider,
    config: &EmbeddingConfig,
) -> Result<Box<dyn Embedder>> {
    let settings = config.provider(provider).clone();
    Ok(match provider {
        EmbeddingProvider::HuggingFace => Box::new(HuggingFaceEmbedder::new(settings)?),
        EmbeddingProvider::OpenAI => Box::new(OpenAIEmbedder::new(settings)?),
    })
}

/// Shared HTTP plumbing for hosted embedders
struct EmbeddingEndpoint {
    http_client: reqwest::Client,
    config: EmbeddingProviderConfig,
    api_key: String,
    cache: ResponseCache,
    metrics: APIMetrics,
}

impl EmbeddingEndpoint {
    fn new(resource: &str, config: EmbeddingProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnirecError::unavailable(resource, "no API key configured"))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnirecError::unavailable(resource, e.to_string()))?;

        Ok(Self {
            http_client,
            config,
            api_key,
            cache: ResponseCache::new(),
            metrics: APIMetrics::default(),
        })
    }

    /// Serve what the cache holds and fetch the rest in one request
    async fn cached<F, Fut>(&self, texts: &[String], fetch: F) -> Result<Vec<Vec<f32>>>
    where
        F: FnOnce(Vec<String>) -> Fut,
        Fut: Future<Output = Result<Vec<Vec<f32>>>>,
    {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = embedding_cache_key(&self.config.model, text);
            if let Some(embedding) = self
                .cache
                .get(&key)
                .and_then(|cached| serde_json::from_str::<Vec<f32>>(&cached).ok())
            {
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                results.push(Some(embedding));
                continue;
            }
            self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - uncached_texts.len(),
                uncached_texts.len()
            );

            let fetched = fetch(uncached_texts.clone()).await.inspect_err(|_| {
                self.metrics.error();
            })?;

            if fetched.len() != uncached_texts.len() {
                self.metrics.error();
                return Err(AnirecError::ExternalError(format!(
                    "embedding service returned {} vectors for {} inputs",
                    fetched.len(),
                    uncached_texts.len()
                )));
            }

            for ((idx, text), embedding) in uncached_indices
                .into_iter()
                .zip(uncached_texts.iter())
                .zip(fetched)
            {
                if let Ok(json) = serde_json::to_string(&embedding) {
                    self.cache
                        .insert(embedding_cache_key(&self.config.model, text), json);
                }
                results[idx] = Some(embedding);
            }
        }

        self.metrics
            .total_latency_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);

        Ok(results.into_iter().flatten().collect())
    }

    async fn check_status(&self, response: reqwest::Response, service: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AnirecError::ExternalError(format!(
            "{} embedding service error (HTTP {}): {}",
            service, status, body
        )))
    }
}

/// Sentence-transformers model served by Hugging Face inference
pub struct HuggingFaceEmbedder {
    endpoint: EmbeddingEndpoint,
}

impl HuggingFaceEmbedder {
    pub fn new(config: EmbeddingProviderConfig) -> Result<Self> {
        Ok(Self {
            endpoint: EmbeddingEndpoint::new("Hugging Face embeddings", config)?,
        })
    }

    async fn fetch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct FeatureRequest {
            inputs: Vec<String>,
        }

        let endpoint = &self.endpoint;
        let url = format!(
            "{}/models/{}/pipeline/feature-extraction",
            endpoint.config.url.trim_end_matches('/'),
            endpoint.config.model
        );

        let response = endpoint
            .http_client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&FeatureRequest { inputs: texts })
            .send()
            .await?;
        let response = endpoint.check_status(response, "Hugging Face").await?;

        Ok(response.json::<Vec<Vec<f32>>>().await?)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.endpoint.cached(texts, |t| self.fetch(t)).await
    }

    fn dimensions(&self) -> usize {
        self.endpoint.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.endpoint.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.endpoint.metrics.snapshot())
    }
}

/// OpenAI `/embeddings` endpoint
pub struct OpenAIEmbedder {
    endpoint: EmbeddingEndpoint,
}

impl OpenAIEmbedder {
    pub fn new(config: EmbeddingProviderConfig) -> Result<Self> {
        Ok(Self {
            endpoint: EmbeddingEndpoint::new("OpenAI embeddings", config)?,
        })
    }

    async fn fetch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            #[serde(default)]
            index: Option<usize>,
            embedding: Vec<f32>,
        }

        let endpoint = &self.endpoint;
        let url = format!("{}/embeddings", endpoint.config.url.trim_end_matches('/'));

        let response = endpoint
            .http_client
            .post(&url)
            .bearer_auth(&endpoint.api_key)
            .json(&EmbedRequest {
                model: &endpoint.config.model,
                input: texts,
            })
            .send()
            .await?;
        let response = endpoint.check_status(response, "OpenAI").await?;
        let body: EmbedResponse = response.json().await?;

        let mut indexed: Vec<(usize, Vec<f32>)> = body
            .data
            .into_iter()
            .enumerate()
            .map(|(fallback, d)| (d.index.unwrap_or(fallback), d.embedding))
            .collect();
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.endpoint.cached(texts, |t| self.fetch(t)).await
    }

    fn dimensions(&self) -> usize {
        self.endpoint.config.dimensions
    }

    fn model_name(&self) -> &str {
        &self.endpoint.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.endpoint.metrics.snapshot())
    }
}
