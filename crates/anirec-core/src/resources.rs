//! Process-wide cache of expensive provider handles
//!
//! Embedders, vector-store connections and chat clients are built lazily the
//! first time a selector asks for them and then shared by every pipeline run.
//! Each key has its own `OnceCell`, so concurrent first access to one key runs
//! a single construction while other keys proceed independently. A failed
//! construction leaves the cell empty and the next call tries again.

use crate::config::{Config, EmbeddingProvider, ModelProvider, VectorBackend};
use crate::error::{AnirecError, Result};
use crate::llm::{embedder_for, ChatClient, Embedder, LanguageModel};
use crate::store::{LocalStore, PineconeStore, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Builds the resources the cache hands out
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    async fn embedder(&self, provider: EmbeddingProvider) -> Result<Arc<dyn Embedder>>;

    async fn vector_store(
        &self,
        backend: VectorBackend,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Arc<dyn VectorStore>>;

    async fn language_model(&self, provider: ModelProvider) -> Result<Arc<dyn LanguageModel>>;
}

/// Factory for the real hosted providers
pub struct ProviderFactory {
    config: Arc<Config>,
}

impl ProviderFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ResourceFactory for ProviderFactory {
    async fn embedder(&self, provider: EmbeddingProvider) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::from(embedder_for(provider, &self.config.embedding)?))
    }

    async fn vector_store(
        &self,
        backend: VectorBackend,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Arc<dyn VectorStore>> {
        match backend {
            VectorBackend::Pinecone => {
                let store = PineconeStore::connect(&self.config.pinecone, embedder).await?;
                Ok(Arc::new(store))
            }
            VectorBackend::Local => {
                let path = &self.config.local_store.path;
                tracing::info!("Opening local index at {}", path.display());
                let store = LocalStore::open(path, embedder).map_err(|e| {
                    AnirecError::unavailable(
                        format!("local index {}", path.display()),
                        e.to_string(),
                    )
                })?;
                Ok(Arc::new(store))
            }
        }
    }

    async fn language_model(&self, provider: ModelProvider) -> Result<Arc<dyn LanguageModel>> {
        Ok(Arc::new(ChatClient::for_provider(provider, &self.config.llm)?))
    }
}

type Slots<K, V> = Mutex<HashMap<K, Arc<OnceCell<V>>>>;

/// Memoizing cache keyed by explicit selector values
pub struct ResourceCache {
    factory: Arc<dyn ResourceFactory>,
    embedders: Slots<EmbeddingProvider, Arc<dyn Embedder>>,
    stores: Slots<(VectorBackend, EmbeddingProvider), Arc<dyn VectorStore>>,
    models: Slots<ModelProvider, Arc<dyn LanguageModel>>,
}

impl ResourceCache {
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self {
            factory,
            embedders: Mutex::new(HashMap::new()),
            stores: Mutex::new(HashMap::new()),
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Cache backed by the hosted providers described in `config`
    pub fn from_config(config: Arc<Config>) -> Self {
        Self::new(Arc::new(ProviderFactory::new(config)))
    }

    /// Embedding model for `provider`, built on first use
    pub async fn get_embedder(&self, provider: EmbeddingProvider) -> Result<Arc<dyn Embedder>> {
        let cell = slot(&self.embedders, provider)?;
        let embedder = cell
            .get_or_try_init(|| async {
                tracing::info!("Initializing {} embedding model", provider);
                self.factory.embedder(provider).await
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    /// Vector store for `backend` in the `provider` embedding space, built on first use
    pub async fn get_vector_store(
        &self,
        backend: VectorBackend,
        provider: EmbeddingProvider,
    ) -> Result<Arc<dyn VectorStore>> {
        let cell = slot(&self.stores, (backend, provider))?;
        let store = cell
            .get_or_try_init(|| async {
                let embedder = self.get_embedder(provider).await?;
                tracing::info!("Connecting to {} vector store ({} embeddings)", backend, provider);
                self.factory.vector_store(backend, embedder).await
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// Chat model client for `provider`, built on first use
    pub async fn get_language_model(
        &self,
        provider: ModelProvider,
    ) -> Result<Arc<dyn LanguageModel>> {
        let cell = slot(&self.models, provider)?;
        let model = cell
            .get_or_try_init(|| async {
                tracing::info!("Initializing {} chat model", provider);
                self.factory.language_model(provider).await
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

/// Fetch or create the cell for `key`; the map lock is never held across an await
fn slot<K, V>(slots: &Slots<K, V>, key: K) -> Result<Arc<OnceCell<V>>>
where
    K: Eq + Hash,
{
    let mut map = slots
        .lock()
        .map_err(|_| AnirecError::ExternalError("resource cache lock poisoned".to_string()))?;
    Ok(Arc::clone(map.entry(key).or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, OutputSchema};
    use crate::schema::CatalogMatch;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]; texts.len()])
        }
        fn dimensions(&self) -> usize {
            1
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubStore(VectorBackend);

    #[async_trait]
    impl VectorStore for StubStore {
        async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<CatalogMatch>> {
            Ok(Vec::new())
        }
        fn backend(&self) -> VectorBackend {
            self.0
        }
    }

    struct StubModel;

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn complete_structured(
            &self,
            _messages: Vec<ChatMessage>,
            _schema: &OutputSchema,
        ) -> Result<Value> {
            Ok(Value::Null)
        }
        fn model_name(&self) -> &str {
            "stub"
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        embedders: AtomicUsize,
        stores: AtomicUsize,
        models: AtomicUsize,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl ResourceFactory for CountingFactory {
        async fn embedder(&self, _provider: EmbeddingProvider) -> Result<Arc<dyn Embedder>> {
            self.embedders.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubEmbedder))
        }

        async fn vector_store(
            &self,
            backend: VectorBackend,
            _embedder: Arc<dyn Embedder>,
        ) -> Result<Arc<dyn VectorStore>> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            // widen the race window for concurrent callers
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AnirecError::unavailable("stub index", "connection refused"));
            }
            Ok(Arc::new(StubStore(backend)))
        }

        async fn language_model(&self, _provider: ModelProvider) -> Result<Arc<dyn LanguageModel>> {
            self.models.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubModel))
        }
    }

    #[tokio::test]
    async fn test_same_key_returns_identical_instance() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ResourceCache::new(factory.clone());

        let a = cache
            .get_vector_store(VectorBackend::Local, EmbeddingProvider::HuggingFace)
            .await
            .unwrap();
        let b = cache
            .get_vector_store(VectorBackend::Local, EmbeddingProvider::HuggingFace)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.stores.load(Ordering::SeqCst), 1);
        assert_eq!(factory.embedders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_build_distinct_instances() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ResourceCache::new(factory.clone());

        let local = cache
            .get_vector_store(VectorBackend::Local, EmbeddingProvider::HuggingFace)
            .await
            .unwrap();
        let pinecone = cache
            .get_vector_store(VectorBackend::Pinecone, EmbeddingProvider::HuggingFace)
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&local, &pinecone));
        assert_eq!(local.backend(), VectorBackend::Local);
        assert_eq!(pinecone.backend(), VectorBackend::Pinecone);
        // both stores share the one HuggingFace embedder
        assert_eq!(factory.embedders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_constructs_once() {
        let factory = Arc::new(CountingFactory::default());
        let cache = Arc::new(ResourceCache::new(factory.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache
                    .get_vector_store(VectorBackend::Pinecone, EmbeddingProvider::OpenAI)
                    .await
                    .unwrap()
            }));
        }

        let mut stores = Vec::new();
        for handle in handles {
            stores.push(handle.await.unwrap());
        }

        assert_eq!(factory.stores.load(Ordering::SeqCst), 1);
        assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_failed_construction_is_retried() {
        let factory = Arc::new(CountingFactory::default());
        factory.failures_left.store(1, Ordering::SeqCst);
        let cache = ResourceCache::new(factory.clone());

        let err = cache
            .get_vector_store(VectorBackend::Pinecone, EmbeddingProvider::HuggingFace)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AnirecError::ResourceUnavailable { .. }));

        let store = cache
            .get_vector_store(VectorBackend::Pinecone, EmbeddingProvider::HuggingFace)
            .await;
        assert!(store.is_ok());
        assert_eq!(factory.stores.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_language_models_cached_per_provider() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ResourceCache::new(factory.clone());

        let groq = cache.get_language_model(ModelProvider::Groq).await.unwrap();
        let again = cache.get_language_model(ModelProvider::Groq).await.unwrap();
        let gemini = cache.get_language_model(ModelProvider::Gemini).await.unwrap();

        assert!(Arc::ptr_eq(&groq, &again));
        assert!(!Arc::ptr_eq(&groq, &gemini));
        assert_eq!(factory.models.load(Ordering::SeqCst), 2);
    }
}
