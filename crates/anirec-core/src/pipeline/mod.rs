//! Refine → retrieve → recommend workflow
//!
//! Stages run strictly in sequence. Each takes the state produced by the one
//! before it and returns the next state. Retrieval and enrichment absorb their
//! own failures; anything else escapes tagged with the stage it came from.

mod state;

pub use state::{Phase, PipelineRequest, PipelineState, Stage, StageTiming};

use crate::config::{Config, PipelineConfig};
use crate::enrich::Enricher;
use crate::error::Result;
use crate::llm::Gateway;
use crate::resources::ResourceCache;
use crate::retrieval::RetrievalService;
use crate::schema::title_key;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Recommendation pipeline sharing one resource cache across invocations
pub struct Pipeline {
    resources: Arc<ResourceCache>,
    retrieval: RetrievalService,
    enricher: Option<Enricher>,
    settings: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        resources: Arc<ResourceCache>,
        enricher: Option<Enricher>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            retrieval: RetrievalService::new(Arc::clone(&resources)),
            resources,
            enricher,
            settings,
        }
    }

    /// Pipeline over the hosted providers in `config`
    ///
    /// Web enrichment is disabled (with a warning) when no search key is set.
    pub fn from_config(config: Arc<Config>) -> Self {
        let enricher = match Enricher::from_config(&config.web_search) {
            Ok(enricher) => Some(enricher),
            Err(e) => {
                tracing::warn!("Web enrichment disabled: {}", e);
                None
            }
        };
        let settings = config.pipeline.clone();
        Self::new(
            Arc::new(ResourceCache::from_config(config)),
            enricher,
            settings,
        )
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    /// Run all stages for one request and return the terminal state
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineState> {
        let total = Instant::now();
        let state = PipelineState::new(request);

        let started = Instant::now();
        let mut state = self
            .refine(state)
            .await
            .map_err(|e| e.at_stage(Stage::Refine))?;
        finish(&mut state, Stage::Refine, started);

        let started = Instant::now();
        let mut state = self.retrieve(state).await;
        finish(&mut state, Stage::Retrieve, started);

        let started = Instant::now();
        let mut state = self
            .recommend(state)
            .await
            .map_err(|e| e.at_stage(Stage::Recommend))?;
        finish(&mut state, Stage::Recommend, started);

        tracing::info!(
            "Pipeline produced {} recommendations in {}ms",
            state.recommendations().len(),
            total.elapsed().as_millis()
        );
        Ok(state)
    }

    async fn gateway(&self, state: &PipelineState) -> Result<Gateway> {
        let model = self
            .resources
            .get_language_model(state.model_provider())
            .await?;
        Ok(Gateway::new(model))
    }

    async fn refine(&self, state: PipelineState) -> Result<PipelineState> {
        let gateway = self.gateway(&state).await?;
        let refined = gateway.refine(state.input_text()).await?;
        tracing::info!("Refined query: {}", refined.refined_query);
        Ok(state.with_refined_query(refined.refined_query))
    }

    async fn retrieve(&self, state: PipelineState) -> PipelineState {
        let query = state
            .refined_query()
            .unwrap_or_else(|| state.input_text())
            .to_string();
        let context = self
            .retrieval
            .retrieve(
                &query,
                self.settings.retrieval_k,
                state.vector_backend(),
                state.embedding_provider(),
            )
            .await;
        state.with_retrieved_context(context)
    }

    async fn recommend(&self, mut state: PipelineState) -> Result<PipelineState> {
        let titles = context_titles(&state);

        let started = Instant::now();
        let enrichment = match &self.enricher {
            Some(enricher) if !titles.is_empty() => enricher.enrich(&titles).await,
            _ => HashMap::new(),
        };
        finish(&mut state, Stage::Enrich, started);

        let gateway = self.gateway(&state).await?;
        let recommendations = gateway
            .recommend(
                state.refined_query().unwrap_or_else(|| state.input_text()),
                state.retrieved_context(),
                &enrichment,
                self.settings.recommendation_count,
            )
            .await?;

        Ok(state.with_recommendations(recommendations))
    }
}

/// Distinct titles of the retrieved context, in retrieval order
fn context_titles(state: &PipelineState) -> Vec<String> {
    let mut seen = HashSet::new();
    state
        .retrieved_context()
        .iter()
        .filter(|m| seen.insert(title_key(&m.title)))
        .map(|m| m.title.clone())
        .collect()
}

fn finish(state: &mut PipelineState, stage: Stage, started: Instant) {
    let elapsed = started.elapsed();
    tracing::info!("Stage {} finished in {}ms", stage, elapsed.as_millis());
    state.record_timing(stage, elapsed);
}
