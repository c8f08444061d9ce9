//! Ingest a PDF into the vector store
//!
//! Run with: cargo run --bin ingest -- --pdf document.pdf

use clap::Parser;
use pdf_rag::{build_embedder, Config, EmbeddedChunk, PdfParser, PgVectorStore, TextSplitter};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(about = "Ingest a PDF into the pgvector collection")]
struct Args {
    /// PDF to ingest; overrides PDF_PATH from the environment
    #[arg(long)]
    pdf: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_rag=info,ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(pdf) = args.pdf {
        config.pdf_path = pdf;
    }

    tracing::info!("Loading PDF from {}...", config.pdf_path.display());
    let parsed = PdfParser::parse_file(&config.pdf_path)?;
    tracing::info!(
        "Extracted text from {} of {} pages in '{}'",
        parsed.pages.len(),
        parsed.total_pages,
        parsed.filename
    );

    tracing::info!("Splitting documents into chunks...");
    let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap);
    let chunks = splitter.split_document(&parsed);
    anyhow::ensure!(!chunks.is_empty(), "The PDF produced no chunks to ingest");
    tracing::info!("Created {} chunks", chunks.len());

    tracing::info!("Generating embeddings and storing in database...");
    let embedder = build_embedder(&config)?;
    tracing::info!(
        "Embedding with {} model '{}'",
        embedder.name(),
        embedder.model()
    );

    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    anyhow::ensure!(
        embeddings.len() == chunks.len(),
        "Got {} embeddings for {} chunks",
        embeddings.len(),
        chunks.len()
    );
    let dimension = embeddings.first().map(|embedding| embedding.len()).unwrap_or(0);

    let embedded: Vec<EmbeddedChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
        .collect();

    let store = PgVectorStore::connect(&config.database_url).await?;
    let collection_id = store.reset_collection(&config.collection_name).await?;
    let stored = store.insert_chunks(collection_id, &embedded).await?;

    tracing::info!(
        "Ingestion complete: {} chunks ({}-dimensional) in collection '{}'",
        stored,
        dimension,
        config.collection_name
    );

    Ok(())
}
