//! Catalog ingestion into the local vector store
//!
//! Reads the anime catalog CSV, builds the text that gets embedded for each
//! title and writes embedded entries in batches.

use crate::error::{AnirecError, Result};
use crate::schema::{split_genres, CatalogMetadata};
use crate::store::{LocalStore, StoredEntry};
use csv::ReaderBuilder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogRecord {
    pub id: Option<String>,
    pub title: String,
    pub score: Option<f64>,
    pub genres: Vec<String>,
    pub synopsis: Option<String>,
    pub themes: Vec<String>,
    pub episodes: Option<u32>,
    pub image_url: Option<String>,
    pub rating: Option<String>,
    pub demographic: Option<String>,
}

impl CatalogRecord {
    fn from_row(row: &HashMap<String, String>) -> Option<Self> {
        let field = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .filter_map(|n| row.get(*n))
                .map(|v| v.trim())
                .find(|v| !v.is_empty() && !v.eq_ignore_ascii_case("unknown"))
                .map(str::to_string)
        };

        let title = field(&["Name", "name", "title", "Title"])?;

        Some(Self {
            id: field(&["MAL_ID", "mal_id", "id"]),
            title,
            score: field(&["Score", "score"]).and_then(|s| s.parse().ok()),
            genres: field(&["Genres", "genres"])
                .map(|g| split_genres(&g))
                .unwrap_or_default(),
            // the public dataset misspells this column
            synopsis: field(&["sypnopsis", "synopsis", "Synopsis"]),
            themes: field(&["Themes", "themes"])
                .map(|t| split_genres(&t))
                .unwrap_or_default(),
            episodes: field(&["Episodes", "episodes"])
                .and_then(|e| e.parse::<f64>().ok())
                .filter(|e| *e >= 0.0)
                .map(|e| e.round() as u32),
            image_url: field(&["image_url", "Image URL"]),
            rating: field(&["Rating", "rating"]),
            demographic: field(&["Demographic", "demographic"]),
        })
    }

    /// Text embedded for this title
    pub fn content(&self) -> String {
        let mut lines = vec![format!("Title: {}", self.title)];
        if !self.genres.is_empty() {
            lines.push(format!("Genres: {}", self.genres.join(", ")));
        }
        if let Some(synopsis) = &self.synopsis {
            lines.push(format!("Synopsis: {}", synopsis));
        }
        if !self.themes.is_empty() {
            lines.push(format!("Themes: {}", self.themes.join(", ")));
        }
        lines.join("\n")
    }

    /// Stable entry id: the catalog id, or a title hash when the row has none
    pub fn entry_id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.title.as_bytes());
                format!("title-{}", &format!("{:x}", hasher.finalize())[..16])
            }
        }
    }

    pub fn to_entry(&self) -> StoredEntry {
        let id = self.entry_id();
        StoredEntry {
            id: id.clone(),
            title: self.title.clone(),
            content: self.content(),
            metadata: CatalogMetadata {
                id: Some(id),
                score: self.score,
                episodes: self.episodes,
                rating: self.rating.clone(),
                genres: (!self.genres.is_empty()).then(|| self.genres.clone()),
                demographic: self.demographic.clone(),
                image_url: self.image_url.clone(),
            },
        }
    }
}

/// Read every titled row from a catalog CSV
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AnirecError::InvalidInput(format!("cannot read {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (row_num, row) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        let row = row?;
        match CatalogRecord::from_row(&row) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                tracing::warn!("Skipping CSV row {}: no title", row_num + 1);
            }
        }
    }

    tracing::info!(
        "Loaded {} catalog rows from {} ({} skipped)",
        records.len(),
        path.display(),
        skipped
    );
    Ok(records)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub entries: usize,
    pub batches: usize,
    pub model: String,
}

/// Embed `records` with the store's embedder and upsert them
pub async fn ingest_local(
    store: &LocalStore,
    records: &[CatalogRecord],
    batch_size: usize,
) -> Result<IngestStats> {
    let batch_size = batch_size.max(1);
    let embedder = store.embedder();
    let mut stats = IngestStats {
        model: embedder.model_name().to_string(),
        ..Default::default()
    };
    let total_batches = records.len().div_ceil(batch_size);

    for chunk in records.chunks(batch_size) {
        let entries: Vec<StoredEntry> = chunk.iter().map(CatalogRecord::to_entry).collect();
        let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();

        let embeddings = embedder.embed_batch(&texts).await?;
        stats.entries += store.upsert(&entries, &embeddings)?;
        stats.batches += 1;

        tracing::info!("Ingested batch {}/{}", stats.batches, total_batches);
    }

    Ok(stats)
}
