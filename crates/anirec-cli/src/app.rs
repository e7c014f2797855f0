//! CLI argument definitions

use anirec_core::{EmbeddingProvider, ModelProvider, VectorBackend};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anirec")]
#[command(
    author,
    version,
    about = "Anime recommendations from a free-text request, backed by semantic search and LLM ranking"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend anime for a free-text request
    Recommend(RecommendArgs),

    /// Semantic catalog search without ranking
    Search(SearchArgs),

    /// Load a catalog CSV into the local index
    Ingest(IngestArgs),

    /// Show the effective configuration
    Config,
}

/// Provider selection shared by commands that touch the index
#[derive(Args, Clone, Copy)]
pub struct BackendArgs {
    /// Vector index: pinecone, or local (alias chromadb)
    #[arg(long, default_value_t = VectorBackend::default())]
    pub vector_backend: VectorBackend,

    /// Embedding model: huggingface or openai
    #[arg(long, default_value_t = EmbeddingProvider::default())]
    pub embedding: EmbeddingProvider,
}

#[derive(Args)]
pub struct RecommendArgs {
    /// What you feel like watching
    #[arg(required = true)]
    pub query: Vec<String>,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Language model: groq, openai or gemini
    #[arg(long, default_value_t = ModelProvider::default())]
    pub model: ModelProvider,

    /// Catalog matches to retrieve
    #[arg(short)]
    pub k: Option<usize>,

    /// Recommendations to return
    #[arg(short = 'n', long)]
    pub count: Option<usize>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of results
    #[arg(short = 'n', default_value = "8")]
    pub limit: usize,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args)]
pub struct IngestArgs {
    /// Catalog CSV file
    pub csv: PathBuf,

    /// Embedding model: huggingface or openai
    #[arg(long, default_value_t = EmbeddingProvider::default())]
    pub embedding: EmbeddingProvider,

    /// Texts embedded per request
    #[arg(long, default_value = "64")]
    pub batch_size: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
    Md,
}
