//! Backend selectors
//!
//! Each selector names one interchangeable provider family. They are parsed
//! from user-facing names once, at the boundary, and passed around as enums.

use crate::error::{AnirecError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vector index backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Cloud-hosted Pinecone index
    #[default]
    Pinecone,
    /// Locally persisted SQLite index (accepts the `chromadb` name)
    #[serde(alias = "chromadb")]
    Local,
}

impl VectorBackend {
    pub const ALL: [VectorBackend; 2] = [VectorBackend::Pinecone, VectorBackend::Local];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pinecone => "pinecone",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for VectorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorBackend {
    type Err = AnirecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "local" | "chroma" | "chromadb" | "sqlite" => Ok(Self::Local),
            other => Err(AnirecError::InvalidInput(format!(
                "unknown vector backend '{}' (expected pinecone or local)",
                other
            ))),
        }
    }
}

/// Embedding model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    HuggingFace,
    OpenAI,
}

impl EmbeddingProvider {
    pub const ALL: [EmbeddingProvider; 2] =
        [EmbeddingProvider::HuggingFace, EmbeddingProvider::OpenAI];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::OpenAI => "openai",
        }
    }
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingProvider {
    type Err = AnirecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            other => Err(AnirecError::InvalidInput(format!(
                "unknown embedding provider '{}' (expected huggingface or openai)",
                other
            ))),
        }
    }
}

/// Hosted language model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Groq,
    OpenAI,
    Gemini,
}

impl ModelProvider {
    pub const ALL: [ModelProvider; 3] =
        [ModelProvider::Groq, ModelProvider::OpenAI, ModelProvider::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = AnirecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(AnirecError::InvalidInput(format!(
                "unknown model provider '{}' (expected groq, openai or gemini)",
                other
            ))),
        }
    }
}
