//! Language model and embedding integration
//!
//! Provides:
//! - Capability traits for embedders and structured-output chat models
//! - Hosted embedders (Hugging Face inference, OpenAI)
//! - An OpenAI-compatible chat client covering Groq, OpenAI and Gemini
//! - The gateway exposing query refinement and recommendation synthesis

mod cache;
mod client;
mod embedder;
mod gateway;
mod traits;

pub use cache::ResponseCache;
pub use client::{extract_json, APIMetrics, ChatClient, ChatMessage, MetricsSnapshot};
pub use embedder::{embedder_for, HuggingFaceEmbedder, OpenAIEmbedder};
pub use gateway::{enforce_source_priority, Gateway};
pub use traits::*;
