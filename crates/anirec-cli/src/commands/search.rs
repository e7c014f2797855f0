//! Search command

use crate::app::{OutputFormat, SearchArgs};
use crate::output::{format_matches, FormatOptions};
use anirec_core::{Config, ResourceCache, RetrievalService};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

/// Retrieval only: no refinement, enrichment or ranking
pub async fn run(args: SearchArgs, config: Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let retrieval = RetrievalService::new(Arc::new(ResourceCache::from_config(Arc::new(config))));

    let started = Instant::now();
    let matches = retrieval
        .retrieve(
            &query,
            args.limit,
            args.backend.vector_backend,
            args.backend.embedding,
        )
        .await;

    if matches.is_empty() && format == OutputFormat::Cli {
        eprintln!(
            "No matches. Check that the {} index is populated and reachable (run with -v for details).",
            args.backend.vector_backend
        );
    }

    let options = FormatOptions {
        query: Some(query),
        refined_query: None,
        elapsed: Some(started.elapsed()),
    };
    print!("{}", format_matches(&matches, format, &options));
    Ok(())
}
