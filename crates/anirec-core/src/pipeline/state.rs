//! Per-invocation pipeline state

use crate::config::{EmbeddingProvider, ModelProvider, VectorBackend};
use crate::schema::{AnimeRecommendation, CatalogMatch};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Pipeline stage, used for timing and failure attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Refine,
    Retrieve,
    Enrich,
    Recommend,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Refine => "refine",
            Stage::Retrieve => "retrieve",
            Stage::Enrich => "enrich",
            Stage::Recommend => "recommend",
        };
        f.write_str(name)
    }
}

/// How far an invocation has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Refined,
    Retrieved,
    Recommended,
}

/// Caller input for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub input_text: String,
    pub vector_backend: VectorBackend,
    pub embedding_provider: EmbeddingProvider,
    pub model_provider: ModelProvider,
}

impl PipelineRequest {
    /// Request using the default selectors
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            vector_backend: VectorBackend::default(),
            embedding_provider: EmbeddingProvider::default(),
            model_provider: ModelProvider::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u128,
}

/// State threaded through the stages of a single invocation
///
/// Fields are written only through the phase transitions below, each of which
/// is valid from exactly one phase, so later-stage fields are never populated
/// ahead of earlier ones. The caller's input and selectors are read-only.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    input_text: String,
    refined_query: Option<String>,
    retrieved_context: Vec<CatalogMatch>,
    recommendations: Vec<AnimeRecommendation>,
    vector_backend: VectorBackend,
    embedding_provider: EmbeddingProvider,
    model_provider: ModelProvider,
    phase: Phase,
    timings: Vec<StageTiming>,
}

impl PipelineState {
    pub fn new(request: PipelineRequest) -> Self {
        Self {
            input_text: request.input_text,
            refined_query: None,
            retrieved_context: Vec::new(),
            recommendations: Vec::new(),
            vector_backend: request.vector_backend,
            embedding_provider: request.embedding_provider,
            model_provider: request.model_provider,
            phase: Phase::Start,
            timings: Vec::new(),
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn refined_query(&self) -> Option<&str> {
        self.refined_query.as_deref()
    }

    pub fn retrieved_context(&self) -> &[CatalogMatch] {
        &self.retrieved_context
    }

    pub fn recommendations(&self) -> &[AnimeRecommendation] {
        &self.recommendations
    }

    pub fn vector_backend(&self) -> VectorBackend {
        self.vector_backend
    }

    pub fn embedding_provider(&self) -> EmbeddingProvider {
        self.embedding_provider
    }

    pub fn model_provider(&self) -> ModelProvider {
        self.model_provider
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    /// Consume the state, keeping only the terminal output
    pub fn into_recommendations(self) -> Vec<AnimeRecommendation> {
        self.recommendations
    }

    pub(crate) fn with_refined_query(mut self, refined_query: String) -> Self {
        debug_assert_eq!(self.phase, Phase::Start);
        self.refined_query = Some(refined_query);
        self.phase = Phase::Refined;
        self
    }

    pub(crate) fn with_retrieved_context(mut self, context: Vec<CatalogMatch>) -> Self {
        debug_assert_eq!(self.phase, Phase::Refined);
        self.retrieved_context = context;
        self.phase = Phase::Retrieved;
        self
    }

    pub(crate) fn with_recommendations(mut self, recommendations: Vec<AnimeRecommendation>) -> Self {
        debug_assert_eq!(self.phase, Phase::Retrieved);
        self.recommendations = recommendations;
        self.phase = Phase::Recommended;
        self
    }

    pub(crate) fn record_timing(&mut self, stage: Stage, elapsed: Duration) {
        self.timings.push(StageTiming {
            stage,
            elapsed_ms: elapsed.as_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_advance_phase() {
        let state = PipelineState::new(PipelineRequest::new("mecha with politics"));
        assert_eq!(state.phase(), Phase::Start);
        assert_eq!(state.refined_query(), None);

        let state = state.with_refined_query("mecha anime with political intrigue".to_string());
        assert_eq!(state.phase(), Phase::Refined);

        let state = state.with_retrieved_context(Vec::new());
        let state = state.with_recommendations(Vec::new());
        assert_eq!(state.phase(), Phase::Recommended);
        assert_eq!(state.input_text(), "mecha with politics");
    }

    #[test]
    fn test_stage_display_is_lowercase() {
        assert_eq!(Stage::Refine.to_string(), "refine");
        assert_eq!(Stage::Recommend.to_string(), "recommend");
        assert!(Phase::Start < Phase::Recommended);
    }

    #[test]
    fn test_request_defaults() {
        let request = PipelineRequest::new("x");
        assert_eq!(request.vector_backend, VectorBackend::Pinecone);
        assert_eq!(request.embedding_provider, EmbeddingProvider::HuggingFace);
        assert_eq!(request.model_provider, ModelProvider::Groq);
    }
}
