//! Vector index backends
//!
//! A store owns its embedding model: callers hand it query text and get back
//! catalog matches ranked by similarity in that model's embedding space.

mod local;
mod pinecone;

pub use local::{LocalStore, StoredEntry};
pub use pinecone::PineconeStore;

use crate::config::VectorBackend;
use crate::error::Result;
use crate::schema::CatalogMatch;
use async_trait::async_trait;

/// Similarity search over an embedded catalog
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return at most `k` matches, most similar first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<CatalogMatch>>;

    /// Which backend family this store belongs to
    fn backend(&self) -> VectorBackend;
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Convert embedding to little-endian bytes
pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to embedding
pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
