//! Recommend command

use crate::app::{OutputFormat, RecommendArgs};
use crate::output::{format_recommendations, format_usage, FormatOptions};
use crate::progress::StatusLine;
use anirec_core::{Config, Pipeline, PipelineRequest, PipelineState};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

pub async fn run(
    args: RecommendArgs,
    mut config: Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.query.join(" ");

    if let Some(k) = args.k {
        config.pipeline.retrieval_k = k;
    }
    if let Some(count) = args.count {
        config.pipeline.recommendation_count = count;
    }
    config.validate()?;

    let pipeline = Pipeline::from_config(Arc::new(config));
    let request = PipelineRequest {
        input_text: query.clone(),
        vector_backend: args.backend.vector_backend,
        embedding_provider: args.backend.embedding,
        model_provider: args.model,
    };

    let status = StatusLine::new(format == OutputFormat::Cli);
    status.set_message(&format!(
        "Searching {} with {} ...",
        request.vector_backend, request.model_provider
    ));

    let started = Instant::now();
    let result = pipeline.run(request).await;
    status.clear();
    let state = result?;

    let options = FormatOptions {
        query: Some(query),
        refined_query: state.refined_query().map(str::to_string),
        elapsed: Some(started.elapsed()),
    };
    print!(
        "{}",
        format_recommendations(state.recommendations(), format, &options)
    );

    if verbose {
        report_usage(&pipeline, &state).await;
    }
    Ok(())
}

/// Request counters of the providers this run used, on stderr
async fn report_usage(pipeline: &Pipeline, state: &PipelineState) {
    let resources = pipeline.resources();

    if let Ok(model) = resources.get_language_model(state.model_provider()).await {
        if let Some(metrics) = model.metrics() {
            let label = format!("{} {}", state.model_provider(), model.model_name());
            eprintln!("{}", format_usage(&label, &metrics));
        }
    }
    if let Ok(embedder) = resources.get_embedder(state.embedding_provider()).await {
        if let Some(metrics) = embedder.metrics() {
            let label = format!("{} {}", state.embedding_provider(), embedder.model_name());
            eprintln!("{}", format_usage(&label, &metrics));
        }
    }
}
