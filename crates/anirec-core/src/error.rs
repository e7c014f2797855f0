//! Error types for anirec

use crate::pipeline::Stage;
use thiserror::Error;

/// Result type alias using AnirecError
pub type Result<T> = std::result::Result<T, AnirecError>;

/// Error type alias for convenience
pub type Error = AnirecError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
    pub const UNAVAILABLE: i32 = 4;
}

/// Main error type for anirec
#[derive(Debug, Error)]
pub enum AnirecError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A cached resource (embedder, vector store, model client) could not be built
    #[error("{resource} unavailable: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    /// Retrieval produced no context; the pipeline continues with an empty set
    #[error("Retrieval degraded: {0}")]
    RetrievalDegraded(String),

    /// Web search for one title failed; that title simply has no enrichment
    #[error("Enrichment miss for '{title}': {reason}")]
    EnrichmentMiss { title: String, reason: String },

    /// Model output did not conform to the requested structured shape
    #[error("Synthesis failure: {0}")]
    SynthesisFailure(String),

    /// An unabsorbed stage error, tagged with the stage that raised it
    #[error("Pipeline failed during {stage}: {source}")]
    Pipeline {
        stage: Stage,
        source: Box<AnirecError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),
}

impl AnirecError {
    /// Shorthand for a resource construction failure
    pub fn unavailable(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error with the pipeline stage it escaped from
    pub fn at_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::Pipeline { .. } => already,
            other => Self::Pipeline {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage identity for pipeline-level failures
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Pipeline { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pipeline { source, .. } => source.exit_code(),
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::ResourceUnavailable { .. } => exit_codes::UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
