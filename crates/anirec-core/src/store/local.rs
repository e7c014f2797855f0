//! Locally persisted vector index on SQLite
//!
//! Embeddings are stored as BLOBs next to the catalog entry and compared with
//! cosine similarity in Rust. Rows are keyed by (id, model), so one file can
//! hold several embedding spaces; a search only looks at rows written with the
//! store's own embedding model.

use super::{bytes_to_embedding, cosine_similarity, embedding_to_bytes, VectorStore};
use crate::config::VectorBackend;
use crate::error::{AnirecError, Result};
use crate::llm::Embedder;
use crate::schema::{CatalogMatch, CatalogMetadata};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS catalog (
    id TEXT NOT NULL,
    model TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (id, model)
);

CREATE INDEX IF NOT EXISTS idx_catalog_model ON catalog(model);
"#;

/// One catalog entry ready to be written
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub id: String,
    pub title: String,
    pub content: String,
    pub metadata: CatalogMetadata,
}

/// SQLite-backed vector store
pub struct LocalStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

impl LocalStore {
    /// Open (creating if needed) the index file at `path`
    pub fn open(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?, embedder)
    }

    /// Open an in-memory index
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self> {
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AnirecError::ExternalError("local store lock poisoned".to_string()))
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Insert or replace entries with their precomputed embeddings
    pub fn upsert(&self, entries: &[StoredEntry], embeddings: &[Vec<f32>]) -> Result<usize> {
        if entries.len() != embeddings.len() {
            return Err(AnirecError::InvalidInput(format!(
                "{} entries but {} embeddings",
                entries.len(),
                embeddings.len()
            )));
        }

        let model = self.embedder.model_name().to_string();
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO catalog
                 (id, model, title, content, metadata, dimensions, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for (entry, embedding) in entries.iter().zip(embeddings) {
                stmt.execute(params![
                    entry.id,
                    model,
                    entry.title,
                    entry.content,
                    serde_json::to_string(&entry.metadata)?,
                    embedding.len() as i64,
                    embedding_to_bytes(embedding),
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(entries.len())
    }

    /// Number of entries embedded with this store's model
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM catalog WHERE model = ?1",
            params![self.embedder.model_name()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Rank stored entries against an already-embedded query
    pub fn search_embedding(&self, query: &[f32], k: usize) -> Result<Vec<CatalogMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT title, content, metadata, embedding FROM catalog
             WHERE model = ?1 AND dimensions = ?2",
        )?;

        let rows = stmt
            .query_map(
                params![self.embedder.model_name(), query.len() as i64],
                |row| {
                    let title: String = row.get(0)?;
                    let content: String = row.get(1)?;
                    let metadata: String = row.get(2)?;
                    let embedding: Vec<u8> = row.get(3)?;
                    Ok((title, content, metadata, embedding))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut matches = Vec::with_capacity(rows.len());
        for (title, content, metadata, embedding) in rows {
            let similarity = cosine_similarity(query, &bytes_to_embedding(&embedding));
            if similarity.is_nan() {
                tracing::debug!("Skipping '{}': stored embedding is not a number", title);
                continue;
            }
            matches.push(CatalogMatch {
                title,
                content,
                metadata: serde_json::from_str(&metadata)?,
                similarity,
            });
        }

        matches.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.title.cmp(&b.title))
        });
        matches.truncate(k);

        Ok(matches)
    }
}

#[async_trait]
impl VectorStore for LocalStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<CatalogMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        self.search_embedding(&embedding, k)
    }

    fn backend(&self) -> VectorBackend {
        VectorBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.matches("fight").count() as f32,
                        t.matches("music").count() as f32,
                        0.1,
                    ]
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    fn entry(id: &str, title: &str, content: &str) -> StoredEntry {
        StoredEntry {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            metadata: CatalogMetadata {
                id: Some(id.to_string()),
                ..Default::default()
            },
        }
    }

    async fn seeded() -> LocalStore {
        let store = LocalStore::open_in_memory(Arc::new(AxisEmbedder)).unwrap();
        let entries = vec![
            entry("1", "Bleach", "fight fight fight"),
            entry("2", "K-On!", "music music club"),
            entry("3", "Naruto", "fight and friendship"),
        ];
        let texts: Vec<String> = entries.iter().map(|e| e.content.clone()).collect();
        let embeddings = AxisEmbedder.embed_batch(&texts).await.unwrap();
        store.upsert(&entries, &embeddings).unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = seeded().await;
        let results = store.similarity_search("music", 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "K-On!");
        assert!(results
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
        assert_eq!(results[0].metadata.id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let store = seeded().await;
        assert_eq!(store.similarity_search("fight", 2).await.unwrap().len(), 2);
        assert!(store.similarity_search("fight", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_rows() {
        let store = seeded().await;
        assert_eq!(store.count().unwrap(), 3);

        store
            .upsert(&[entry("1", "Bleach TYBW", "fight")], &[vec![1.0, 0.0, 0.1]])
            .unwrap();
        assert_eq!(store.count().unwrap(), 3);

        let top = store.similarity_search("fight", 1).await.unwrap();
        assert_eq!(top[0].title, "Bleach TYBW");
    }

    #[tokio::test]
    async fn test_nan_embedding_is_never_ranked() {
        let store = seeded().await;
        store
            .upsert(&[entry("4", "Broken", "fight")], &[vec![f32::NAN, 0.0, 0.1]])
            .unwrap();
        assert_eq!(store.count().unwrap(), 4);

        let results = store.similarity_search("fight", 4).await.unwrap();
        let titles: Vec<_> = results.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Naruto", "Bleach", "K-On!"]);
    }

    #[test]
    fn test_upsert_length_mismatch() {
        let store = LocalStore::open_in_memory(Arc::new(AxisEmbedder)).unwrap();
        let err = store.upsert(&[entry("1", "Bleach", "fight")], &[]).unwrap_err();
        assert!(matches!(err, AnirecError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.sqlite");
        {
            let store = LocalStore::open(&path, Arc::new(AxisEmbedder)).unwrap();
            store
                .upsert(&[entry("1", "Bleach", "fight")], &[vec![1.0, 0.0, 0.1]])
                .unwrap();
        }

        let reopened = LocalStore::open(&path, Arc::new(AxisEmbedder)).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
