//! In-process fakes for pipeline integration tests

#![allow(dead_code)]

use anirec_core::config::PipelineConfig;
use anirec_core::error::{AnirecError, Result};
use anirec_core::{
    ingest_local, CatalogRecord, ChatMessage, EmbeddingProvider, Embedder, Enricher,
    LanguageModel, LocalStore, ModelProvider, OutputSchema, Pipeline, ResourceCache,
    ResourceFactory, VectorBackend, VectorStore, WebSearch,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RAW_QUERY: &str = "I want a shonen anime with good fights";
pub const REFINED_QUERY: &str = "Shounen action anime with intense fight and battle scenes";

const KEYWORDS: &[&str] = &[
    "shounen", "fight", "battle", "ninja", "pirate", "sword", "detective", "notebook", "music",
    "club",
];

/// Bag-of-keywords embedder with a constant bias axis
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                let mut v: Vec<f32> = KEYWORDS
                    .iter()
                    .map(|k| text.matches(k).count() as f32)
                    .collect();
                v.push(0.1);
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

fn record(id: &str, title: &str, genres: &str, synopsis: &str, score: Option<f64>) -> CatalogRecord {
    CatalogRecord {
        id: Some(id.to_string()),
        title: title.to_string(),
        score,
        genres: genres.split(", ").map(str::to_string).collect(),
        synopsis: Some(synopsis.to_string()),
        episodes: Some(24),
        rating: Some("PG-13 - Teens 13 or older".to_string()),
        ..Default::default()
    }
}

pub fn seed_catalog() -> Vec<CatalogRecord> {
    vec![
        record(
            "20",
            "Naruto",
            "Action, Shounen",
            "A young ninja seeks recognition; every fight and battle makes him stronger.",
            Some(7.91),
        ),
        record(
            "269",
            "Bleach",
            "Action, Shounen",
            "A substitute soul reaper with a sword takes on a fight and battle against hollows.",
            None,
        ),
        record(
            "21",
            "One Piece",
            "Action, Adventure, Shounen",
            "A pirate crew sails the seas; each fight and battle brings them closer to the treasure.",
            Some(8.52),
        ),
        record(
            "1535",
            "Death Note",
            "Mystery, Psychological",
            "A student finds a notebook and a detective hunts him down.",
            Some(8.63),
        ),
        record(
            "5680",
            "K-On!",
            "Music, Slice of Life",
            "Four friends join the light music club at school.",
            Some(7.86),
        ),
    ]
}

/// Local index seeded with the five-title catalog
pub async fn seeded_store(path: &Path) -> LocalStore {
    let store = LocalStore::open(path, Arc::new(KeywordEmbedder)).unwrap();
    ingest_local(&store, &seed_catalog(), 2).await.unwrap();
    store
}

/// Chat model answering by schema name; records every user prompt it sees
pub struct FakeModel {
    pub prompts: Mutex<Vec<String>>,
    pub malformed_recommendations: bool,
}

impl FakeModel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            malformed_recommendations: false,
        })
    }

    pub fn malformed() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
            malformed_recommendations: true,
        })
    }

    pub fn recommendation_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.contains("Retrieved context"))
            .cloned()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &OutputSchema,
    ) -> Result<Value> {
        if let Some(user) = messages.iter().find(|m| m.role == "user") {
            self.prompts.lock().unwrap().push(user.content.clone());
        }

        match schema.name {
            "refined_query" => Ok(json!({ "refined_query": REFINED_QUERY })),
            "recommended_anime" if self.malformed_recommendations => {
                Ok(json!({ "anime_titles": [ { "score": 9.0 } ] }))
            }
            "recommended_anime" => Ok(json!({
                "anime_titles": [
                    { "title": "Naruto", "description": "Ninja story.", "score": 1.0,
                      "image_url": null, "episodes": 220, "rating": null,
                      "genres": "Action", "demographic": "Shounen" },
                    { "title": "bleach", "description": null, "score": 7.8,
                      "image_url": "https://img.example/bleach.jpg", "episodes": 366,
                      "rating": null, "genres": null, "demographic": "Shounen" },
                    { "title": "One Piece", "description": "Pirates.", "score": null,
                      "image_url": null, "episodes": null, "rating": null,
                      "genres": null, "demographic": null },
                    { "title": "Jujutsu Kaisen", "description": "Curses.", "score": 8.6,
                      "image_url": null, "episodes": 24, "rating": null,
                      "genres": "Action", "demographic": "Shounen" },
                    { "title": "Naruto", "description": "Again.", "score": null,
                      "image_url": null, "episodes": null, "rating": null,
                      "genres": null, "demographic": null },
                    { "title": "Death Note", "description": "A notebook.", "score": null,
                      "image_url": null, "episodes": 37, "rating": null,
                      "genres": null, "demographic": "Shounen" },
                    { "title": "K-On!", "description": "Music club.", "score": null,
                      "image_url": null, "episodes": 13, "rating": null,
                      "genres": null, "demographic": "Seinen" }
                ]
            })),
            other => Err(AnirecError::SynthesisFailure(format!(
                "unexpected schema {}",
                other
            ))),
        }
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

/// Web search where "Bleach" always fails and "Naruto" mentions an uncatalogued title
pub struct FakeSearch;

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        if query.contains("Bleach") {
            return Err(AnirecError::ExternalError("HTTP 503".to_string()));
        }
        let answer = if query.contains("Naruto") {
            "Naruto has 220 episodes. Fans also love Jujutsu Kaisen."
        } else {
            "A well known series."
        };
        Ok(json!({ "answer": answer, "results": [], "images": [] }))
    }
}

/// Factory serving the seeded local index; the cloud backend is never reachable
pub struct FakeFactory {
    pub db_path: PathBuf,
    pub model: Arc<FakeModel>,
}

#[async_trait]
impl ResourceFactory for FakeFactory {
    async fn embedder(&self, _provider: EmbeddingProvider) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::new(KeywordEmbedder))
    }

    async fn vector_store(
        &self,
        backend: VectorBackend,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Arc<dyn VectorStore>> {
        match backend {
            VectorBackend::Local => Ok(Arc::new(LocalStore::open(&self.db_path, embedder)?)),
            VectorBackend::Pinecone => Err(AnirecError::unavailable(
                "Pinecone index 'anime-recommendation-v2'",
                "PINECONE_API_KEY not set",
            )),
        }
    }

    async fn language_model(&self, _provider: ModelProvider) -> Result<Arc<dyn LanguageModel>> {
        Ok(self.model.clone())
    }
}

pub fn pipeline(db_path: &Path, model: Arc<FakeModel>) -> Pipeline {
    let factory = FakeFactory {
        db_path: db_path.to_path_buf(),
        model,
    };
    let enricher = Enricher::new(Arc::new(FakeSearch), 5, Duration::from_secs(5));
    Pipeline::new(
        Arc::new(ResourceCache::new(Arc::new(factory))),
        Some(enricher),
        PipelineConfig::default(),
    )
}
