//! Postgres + pgvector storage for embedded chunks
//!
//! Chunks are grouped into named collections. Re-ingesting a document resets
//! its collection, so the store always reflects the latest ingest run.

use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{ChunkMetadata, EmbeddedChunk, RetrievedChunk};

const SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS vector;

-- Named collections of ingested chunks
CREATE TABLE IF NOT EXISTS rag_collections (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL
);

-- One row per embedded chunk; deleting a collection drops its chunks
CREATE TABLE IF NOT EXISTS rag_chunks (
    id UUID PRIMARY KEY,
    collection_id UUID NOT NULL REFERENCES rag_collections(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    embedding VECTOR NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rag_chunks_collection ON rag_chunks(collection_id);
"#;

/// pgvector-backed chunk store
pub struct PgVectorStore {
    pool: PgPool,
}

impl PgVectorStore {
    /// Connect to the database and run migrations
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| Error::vector_store(format!("Failed to connect to Postgres: {}", e)))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::vector_store(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Look up a collection by name, creating it if missing
    pub async fn ensure_collection(&self, name: &str) -> Result<Uuid> {
        sqlx::query(
            "INSERT INTO rag_collections (id, name, created_at) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT id FROM rag_collections WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("id")?)
    }

    /// Drop all chunks in a collection and return a fresh collection id
    pub async fn reset_collection(&self, name: &str) -> Result<Uuid> {
        // The cascade on rag_chunks removes the chunks with the collection
        sqlx::query("DELETE FROM rag_collections WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.ensure_collection(name).await
    }

    /// Insert embedded chunks into a collection
    pub async fn insert_chunks(
        &self,
        collection_id: Uuid,
        chunks: &[EmbeddedChunk],
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        validate_embeddings(chunks)?;

        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO rag_chunks (id, collection_id, content, metadata, embedding)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(collection_id)
            .bind(&chunk.chunk.content)
            .bind(Json(&chunk.chunk.metadata))
            .bind(Vector::from(chunk.embedding.clone()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    /// Return the `k` chunks nearest to the query embedding, by cosine distance
    pub async fn similarity_search(
        &self,
        collection_id: Uuid,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query(
            "SELECT content, metadata, embedding <=> $2 AS distance
             FROM rag_chunks
             WHERE collection_id = $1
             ORDER BY embedding <=> $2
             LIMIT $3",
        )
        .bind(collection_id)
        .bind(Vector::from(query.to_vec()))
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let metadata: Json<ChunkMetadata> = row.try_get("metadata")?;
            results.push(RetrievedChunk {
                content: row.try_get("content")?,
                metadata: metadata.0,
                distance: row.try_get("distance")?,
            });
        }

        Ok(results)
    }

    /// Number of chunks stored in a collection
    pub async fn chunk_count(&self, collection_id: Uuid) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM rag_chunks WHERE collection_id = $1")
            .bind(collection_id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }
}

/// The embedding column carries no fixed dimension, so empty or mixed-size
/// embeddings must be rejected before insert
fn validate_embeddings(chunks: &[EmbeddedChunk]) -> Result<()> {
    let mut dimension = None;

    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.embedding.is_empty() {
            return Err(Error::vector_store(format!("chunk {} has no embedding", i)));
        }

        match dimension {
            None => dimension = Some(chunk.embedding.len()),
            Some(expected) if expected != chunk.embedding.len() => {
                return Err(Error::vector_store(format!(
                    "embedding dimension mismatch: chunk {} has {} dimensions, expected {}",
                    i,
                    chunk.embedding.len(),
                    expected
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}
