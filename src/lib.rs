//! pdf-rag: PDF question answering over Postgres + pgvector
//!
//! This crate ingests a PDF into a pgvector collection and answers questions
//! about it with a retrieval-augmented chain. Embeddings and generation go
//! through Gemini or OpenAI, selected by a single provider switch.

pub mod chain;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod types;

pub use chain::RagChain;
pub use config::{Config, Provider};
pub use error::{Error, Result};
pub use ingestion::{ParsedPdf, PdfParser, TextSplitter};
pub use prompt::PromptBuilder;
pub use providers::{build_chat_model, build_embedder, ChatModel, Embedder};
pub use store::PgVectorStore;
pub use types::{ChunkMetadata, DocumentChunk, EmbeddedChunk, RetrievedChunk};
