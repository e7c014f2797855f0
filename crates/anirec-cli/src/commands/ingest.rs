//! Ingest command

use crate::app::IngestArgs;
use crate::progress::ProgressReporter;
use anirec_core::{ingest_local, load_catalog, Config, LocalStore, ResourceCache};
use anyhow::Result;
use std::sync::Arc;

/// Batches written between progress updates
const BATCHES_PER_STEP: usize = 4;

pub async fn run(args: IngestArgs, config: Config) -> Result<()> {
    let records = load_catalog(&args.csv)?;
    if records.is_empty() {
        println!("No catalog rows found in {}", args.csv.display());
        return Ok(());
    }

    let db_path = config.local_store.path.clone();
    let resources = ResourceCache::from_config(Arc::new(config));
    let embedder = resources.get_embedder(args.embedding).await?;
    let store = LocalStore::open(&db_path, embedder)?;

    let step = args.batch_size.max(1) * BATCHES_PER_STEP;
    let mut progress = ProgressReporter::new(records.len());
    let mut written = 0;

    for chunk in records.chunks(step) {
        progress.set_message(&format!(
            "Embedding {}..{} of {}",
            written + 1,
            written + chunk.len(),
            records.len()
        ));
        let stats = ingest_local(&store, chunk, args.batch_size).await?;
        written += stats.entries;
        progress.advance(stats.entries);
    }
    progress.finish();

    println!(
        "Indexed {} titles into {} ({} embeddings, {} total)",
        written,
        db_path.display(),
        store.embedder().model_name(),
        store.count()?
    );
    Ok(())
}
