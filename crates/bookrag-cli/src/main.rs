//! bookrag CLI
//!
//! Usage:
//!   bookrag ingest <path> [--collection <name>]
//!   bookrag query <question>
//!   bookrag info [--collection <name>]
//!   bookrag reset [--collection <name>]

use std::path::PathBuf;
use std::sync::Arc;

use bookrag_agent::{BookRagAgent, GeminiCompletion};
use bookrag_core::{AppConfig, RagError, VectorIndexProvider as _};
use bookrag_ingest::Ingestor;
use bookrag_vector::{CohereEmbedding, QdrantIndex};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookrag")]
#[command(about = "Retrieval-augmented Q&A over book content")]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables override secrets
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed documents from a directory into the vector index
    Ingest {
        /// Directory containing book documents
        path: PathBuf,

        /// Target collection (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,
    },
    /// Ask a question against the indexed book
    Query {
        /// Question to ask
        question: String,
    },
    /// Show point count and vector size for a collection
    Info {
        #[arg(long)]
        collection: Option<String>,
    },
    /// Delete a collection and all of its points
    Reset {
        #[arg(long)]
        collection: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    match run(cli.command, config).await {
        Ok(()) => Ok(()),
        Err(RagError::QuotaExceeded(detail)) => {
            tracing::debug!("Quota details: {detail}");
            eprintln!(
                "The generation provider's quota is currently exhausted. \
                 This usually resolves on its own; wait a while and retry, \
                 or switch to an API key with remaining quota."
            );
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

async fn run(command: Commands, config: AppConfig) -> bookrag_core::Result<()> {
    match command {
        Commands::Ingest { path, collection } => {
            let embedder = Arc::new(CohereEmbedding::from_config(&config.providers)?);
            let index = Arc::new(QdrantIndex::from_config(&config.providers)?);
            let ingestor = Ingestor::new(embedder, index, config.ingest.clone());

            let collection = collection.unwrap_or_else(|| config.rag.collection.clone());
            let report = ingestor.ingest(&path, &collection).await?;

            println!(
                "Ingested {} chunks from {} files into '{}' (job {})",
                report.total_chunks, report.total_files, collection, report.job_id
            );
        }
        Commands::Query { question } => {
            let embedder = Arc::new(CohereEmbedding::from_config(&config.providers)?);
            let index = Arc::new(QdrantIndex::from_config(&config.providers)?);
            let completion = Arc::new(GeminiCompletion::from_config(&config.providers)?);
            let agent = BookRagAgent::new(embedder, index, completion, config.rag.clone());

            let result = agent.run(&question).await?;

            println!("{}", result.answer);
            if result.context_used {
                println!("\nSources:");
                for source in &result.sources {
                    println!(
                        "  {}. {} (score: {:.2})",
                        source.rank + 1,
                        source.section,
                        source.relevance_score
                    );
                }
            } else {
                println!("\n(no passages met the relevance threshold; answered without book context)");
            }
        }
        Commands::Info { collection } => {
            let index = QdrantIndex::from_config(&config.providers)?;
            let collection = collection.unwrap_or_else(|| config.rag.collection.clone());
            let info = index.collection_info(&collection).await?;

            println!(
                "Collection '{}': {} points, vector size {}",
                collection, info.points_count, info.vector_size
            );
        }
        Commands::Reset { collection } => {
            let index = QdrantIndex::from_config(&config.providers)?;
            let collection = collection.unwrap_or_else(|| config.rag.collection.clone());
            index.delete_collection(&collection).await?;

            println!("Deleted collection '{collection}'");
        }
    }

    Ok(())
}
