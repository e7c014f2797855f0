//! Best-effort semantic retrieval over the selected vector store

use crate::config::{EmbeddingProvider, VectorBackend};
use crate::error::AnirecError;
use crate::resources::ResourceCache;
use crate::schema::CatalogMatch;
use std::sync::Arc;

/// Retrieves catalog matches through the shared resource cache
///
/// Failures never escape: a store that cannot be built or queried degrades
/// the result to an empty context, which the caller can still act on.
#[derive(Clone)]
pub struct RetrievalService {
    resources: Arc<ResourceCache>,
}

impl RetrievalService {
    pub fn new(resources: Arc<ResourceCache>) -> Self {
        Self { resources }
    }

    /// Up to `k` matches for `query`, most similar first
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        backend: VectorBackend,
        embedding: EmbeddingProvider,
    ) -> Vec<CatalogMatch> {
        if k == 0 {
            return Vec::new();
        }

        let store = match self.resources.get_vector_store(backend, embedding).await {
            Ok(store) => store,
            Err(e) => {
                degrade(AnirecError::RetrievalDegraded(format!("{} store: {}", backend, e)));
                return Vec::new();
            }
        };

        match store.similarity_search(query, k).await {
            Ok(mut matches) => {
                // the store's own ordering is trusted; only the bound is enforced here
                matches.truncate(k);
                tracing::debug!("Retrieved {} matches from {}", matches.len(), backend);
                matches
            }
            Err(e) => {
                degrade(AnirecError::RetrievalDegraded(format!("{} query: {}", backend, e)));
                Vec::new()
            }
        }
    }
}

fn degrade(err: AnirecError) {
    tracing::warn!("{}; continuing with empty context", err);
}
