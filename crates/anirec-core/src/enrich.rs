//! Web-search enrichment for retrieved titles
//!
//! One search per distinct title, run concurrently with a fixed upper bound on
//! in-flight requests. Every lookup has its own timeout and its own failure
//! path: a miss is logged and leaves that title out of the result map.

use crate::config::WebSearchConfig;
use crate::error::{AnirecError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// External web search capability
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Run one search and return the provider's raw payload
    async fn search(&self, query: &str) -> Result<Value>;
}

/// Tavily search API client
pub struct TavilySearch {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(config: &WebSearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnirecError::unavailable("Tavily web search", "TAVILY_API_KEY not set"))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            api_key,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Value> {
        #[derive(Serialize)]
        struct SearchRequest<'a> {
            api_key: &'a str,
            query: &'a str,
            max_results: usize,
            include_answer: &'a str,
            include_images: bool,
        }

        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
            include_answer: "advanced",
            include_images: true,
        };

        let response = self.http_client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnirecError::ExternalError(format!(
                "Tavily error (HTTP {}): {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Supplementary detail found on the web for one title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl EnrichmentRecord {
    /// Distill a search payload into the fields the recommendation prompt uses
    pub fn from_payload(title: &str, payload: &Value) -> Self {
        let text = |v: &Value| {
            v.as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let answer = payload.get("answer").and_then(text);

        let snippets = payload
            .get("results")
            .and_then(Value::as_array)
            .map(|results| {
                results
                    .iter()
                    .filter_map(|r| r.get("content").and_then(text))
                    .collect()
            })
            .unwrap_or_default();

        // images come back either as bare URLs or as {url, description}
        let images = payload
            .get("images")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(|i| text(i).or_else(|| i.get("url").and_then(text)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: title.to_string(),
            answer,
            snippets,
            images,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.snippets.is_empty() && self.images.is_empty()
    }
}

/// Search query sent for one title
pub fn enrichment_query(title: &str) -> String {
    format!(
        "Give me details about {} anime with its description, total number of episodes, rating, genre, demographic",
        title
    )
}

/// Bounded, failure-isolated fan-out over a [`WebSearch`]
#[derive(Clone)]
pub struct Enricher {
    search: Arc<dyn WebSearch>,
    concurrency: usize,
    timeout: Duration,
}

impl Enricher {
    pub fn new(search: Arc<dyn WebSearch>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            search,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &WebSearchConfig) -> Result<Self> {
        let search = TavilySearch::new(config)?;
        Ok(Self::new(
            Arc::new(search),
            config.concurrency,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    /// Look up every distinct title; misses are simply absent from the map
    pub async fn enrich(&self, titles: &[String]) -> HashMap<String, EnrichmentRecord> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = titles
            .iter()
            .filter(|t| !t.trim().is_empty() && seen.insert(t.as_str()))
            .collect();

        if unique.is_empty() {
            return HashMap::new();
        }

        tracing::debug!(
            "Enriching {} titles ({} concurrent)",
            unique.len(),
            self.concurrency
        );

        let results: Vec<_> = stream::iter(unique)
            .map(|title| async move { (title, self.lookup(title).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut records = HashMap::with_capacity(results.len());
        for (title, result) in results {
            match result {
                Ok(record) => {
                    records.insert(title.clone(), record);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }

        tracing::info!("Enriched {}/{} titles", records.len(), seen.len());
        records
    }

    async fn lookup(&self, title: &str) -> Result<EnrichmentRecord> {
        let miss = |reason: String| AnirecError::EnrichmentMiss {
            title: title.to_string(),
            reason,
        };

        let payload = tokio::time::timeout(self.timeout, self.search.search(&enrichment_query(title)))
            .await
            .map_err(|_| miss(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| miss(e.to_string()))?;

        let record = EnrichmentRecord::from_payload(title, &payload);
        if record.is_empty() {
            return Err(miss("search returned no usable content".to_string()));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every query; "Bleach" fails and "Slow" never returns in time
    struct FakeSearch {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FakeSearch {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = if query.contains(" Slow ") { 600 } else { 50 };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if query.contains(" Bleach ") {
                return Err(AnirecError::ExternalError("HTTP 500".to_string()));
            }
            Ok(json!({
                "answer": format!("answer for {}", query),
                "results": [ { "content": "episodes: 12" } ],
                "images": [ "https://img.example/a.jpg", { "url": "https://img.example/b.jpg" } ]
            }))
        }
    }

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_does_not_affect_others() {
        let enricher = Enricher::new(FakeSearch::new(), 5, Duration::from_secs(120));
        let out = enricher
            .enrich(&titles(&["Naruto", "Bleach", "One Piece"]))
            .await;

        assert_eq!(out.len(), 2);
        assert!(out.contains_key("Naruto"));
        assert!(out.contains_key("One Piece"));
        assert!(!out.contains_key("Bleach"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_per_request() {
        let enricher = Enricher::new(FakeSearch::new(), 5, Duration::from_secs(120));
        let out = enricher.enrich(&titles(&["Slow", "Naruto"])).await;

        assert_eq!(out.len(), 1);
        assert!(out.contains_key("Naruto"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let search = FakeSearch::new();
        let enricher = Enricher::new(search.clone(), 2, Duration::from_secs(120));
        let names: Vec<String> = (0..7).map(|i| format!("Show {}", i)).collect();

        let out = enricher.enrich(&names).await;

        assert_eq!(out.len(), 7);
        assert_eq!(search.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_titles_searched_once() {
        let search = FakeSearch::new();
        let enricher = Enricher::new(search.clone(), 5, Duration::from_secs(120));
        let out = enricher
            .enrich(&titles(&["Naruto", "Naruto", " ", "K-On!"]))
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_record_from_payload() {
        let payload = json!({
            "answer": "  Naruto has 220 episodes. ",
            "results": [ { "content": "Shounen, rated PG-13" }, { "title": "no content" } ],
            "images": [ "https://img.example/1.jpg", { "url": "https://img.example/2.jpg" } ]
        });
        let record = EnrichmentRecord::from_payload("Naruto", &payload);

        assert_eq!(record.answer.as_deref(), Some("Naruto has 220 episodes."));
        assert_eq!(record.snippets, vec!["Shounen, rated PG-13"]);
        assert_eq!(record.images.len(), 2);
        assert!(EnrichmentRecord::from_payload("x", &json!({})).is_empty());
    }

    #[test]
    fn test_query_wording() {
        let q = enrichment_query("Bleach");
        assert!(q.starts_with("Give me details about Bleach anime"));
        assert!(q.ends_with("rating, genre, demographic"));
    }

    #[test]
    fn test_tavily_requires_key() {
        let config = WebSearchConfig {
            api_key: Some(" ".to_string()),
            ..WebSearchConfig::default()
        };
        let err = TavilySearch::new(&config).err().unwrap();
        assert!(matches!(err, AnirecError::ResourceUnavailable { .. }));
    }
}
