//! Anirec Core Library
//!
//! Retrieval-augmented anime recommendation pipeline.
//!
//! # Features
//! - Query refinement through structured-output chat models (Groq, OpenAI, Gemini)
//! - Semantic retrieval over Pinecone or a local SQLite vector index
//! - Concurrent, failure-isolated web enrichment of retrieved titles
//! - Ranked synthesis under a strict source-priority contract
//! - Lazily built, shared provider handles keyed by backend selector

pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod resources;
pub mod retrieval;
pub mod schema;
pub mod store;

pub use config::{Config, EmbeddingProvider, ModelProvider, VectorBackend};
pub use enrich::{EnrichmentRecord, Enricher, TavilySearch, WebSearch};
pub use error::{AnirecError, Error, Result};
pub use ingest::{ingest_local, load_catalog, CatalogRecord, IngestStats};
pub use llm::{
    ChatClient, ChatMessage, Embedder, Gateway, LanguageModel, MetricsSnapshot, OutputSchema,
};
pub use pipeline::{Phase, Pipeline, PipelineRequest, PipelineState, Stage};
pub use resources::{ProviderFactory, ResourceCache, ResourceFactory};
pub use retrieval::RetrievalService;
pub use schema::{AnimeRecommendation, CatalogMatch, CatalogMetadata, RefinedQuery};
pub use store::{LocalStore, PineconeStore, VectorStore};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "anirec";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "anirec";
