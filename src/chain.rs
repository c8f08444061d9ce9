//! Retrieval-augmented question answering
//!
//! Wires the embedder, the vector store and the chat model into a single
//! ask() call: embed the question, fetch the nearest chunks, render the
//! prompt and generate an answer.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::prompt::PromptBuilder;
use crate::providers::{build_chat_model, build_embedder, ChatModel, Embedder};
use crate::store::PgVectorStore;

/// Question answering chain over one ingested collection
pub struct RagChain {
    embedder: Arc<dyn Embedder>,
    chat_model: Arc<dyn ChatModel>,
    store: PgVectorStore,
    collection_id: Uuid,
    top_k: usize,
}

impl RagChain {
    /// Build the chain from configuration: providers, database and collection
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let chat_model = build_chat_model(config)?;

        let store = PgVectorStore::connect(&config.database_url).await?;
        let collection_id = store.ensure_collection(&config.collection_name).await?;

        let count = store.chunk_count(collection_id).await?;
        if count == 0 {
            tracing::warn!(
                "Collection '{}' is empty - run the ingest binary first",
                config.collection_name
            );
        } else {
            tracing::info!(
                "Collection '{}' holds {} chunks",
                config.collection_name,
                count
            );
        }

        tracing::info!(
            "Generating answers with {} model '{}'",
            chat_model.name(),
            chat_model.model()
        );

        Ok(Self {
            embedder,
            chat_model,
            store,
            collection_id,
            top_k: config.query.top_k,
        })
    }

    /// Answer a question using only the ingested document as context
    pub async fn ask(&self, question: &str) -> Result<String> {
        let query_embedding = self.embedder.embed(question).await?;

        let results = self
            .store
            .similarity_search(self.collection_id, &query_embedding, self.top_k)
            .await?;
        tracing::debug!("Retrieved {} chunks for the question", results.len());

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_prompt(question, &context);

        let answer = self.chat_model.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }
}
