//! HTTP client for OpenAI-compatible chat completion services (Groq, OpenAI, Gemini)

use super::cache::{chat_cache_key, ResponseCache};
use super::{LanguageModel, OutputSchema};
use crate::config::{LlmConfig, LlmProviderConfig, ModelProvider};
use crate::error::{AnirecError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

impl APIMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.total_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            avg_latency_ms: if total > 0 {
                self.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub(crate) fn error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
}

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint
pub struct ChatClient {
    http_client: reqwest::Client,
    provider: ModelProvider,
    config: LlmProviderConfig,
    api_key: String,
    cache: Arc<ResponseCache>,
    metrics: Arc<APIMetrics>,
}

impl ChatClient {
    /// Create a client for one provider; a missing API key is a construction failure
    pub fn new(provider: ModelProvider, config: LlmProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AnirecError::unavailable(
                    format!("{} chat model", provider),
                    "no API key configured",
                )
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnirecError::unavailable(format!("{} chat model", provider), e.to_string()))?;

        Ok(Self {
            http_client,
            provider,
            config,
            api_key,
            cache: Arc::new(ResponseCache::new()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create a client for the selected provider from the `llm` config section
    pub fn for_provider(provider: ModelProvider, config: &LlmConfig) -> Result<Self> {
        Self::new(provider, config.provider(provider).clone())
    }

    pub fn provider(&self) -> ModelProvider {
        self.provider
    }

    async fn request(&self, messages: Vec<ChatMessage>, schema: &OutputSchema) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
            response_format: Value,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Option<String>,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: 0.2,
            max_tokens: self.config.max_tokens,
            response_format: schema.response_format(),
        };

        let url = format!("{}/chat/completions", self.config.url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                self.metrics.error();
                AnirecError::Http(e)
            })?;

        if !response.status().is_success() {
            self.metrics.error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnirecError::ExternalError(format!(
                "{} chat service error (HTTP {}): {}",
                self.provider, status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.metrics.error();
            AnirecError::Http(e)
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                self.metrics.error();
                AnirecError::SynthesisFailure(format!("{} returned no message content", self.provider))
            })
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &OutputSchema,
    ) -> Result<Value> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let messages_json = serde_json::to_string(&messages)?;
        let cache_key = chat_cache_key(&self.config.model, schema.name, &messages_json);

        if let Some(cached) = self.cache.get(&cache_key) {
            tracing::debug!("Cache hit for {} completion", schema.name);
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return extract_json(&cached);
        }
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        let content = self.request(messages, schema).await?;
        let parsed = extract_json(&content)?;

        // Only well-formed JSON is worth replaying
        self.cache.insert(cache_key, content);

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
        tracing::debug!(
            "{} completion for {} took {}ms",
            self.provider,
            schema.name,
            elapsed
        );

        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}

/// Pull the JSON object out of a model reply (handles markdown code fences)
pub fn extract_json(response: &str) -> Result<Value> {
    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            return Err(AnirecError::SynthesisFailure(
                "model reply contains no JSON object".to_string(),
            ))
        }
    };

    serde_json::from_str(json_str).map_err(|e| {
        tracing::debug!("Raw model response: {}", response);
        AnirecError::SynthesisFailure(format!("model reply is not valid JSON: {}", e))
    })
}
