//! Chunk types shared by ingestion, storage, and retrieval

use serde::{Deserialize, Serialize};

/// Source information for a chunk, stored alongside it as JSON metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Filename of the source PDF
    pub source: String,
    /// Page number (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Position of the chunk within the whole document
    pub chunk_index: u32,
}

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk text
    pub content: String,
    /// Source metadata
    pub metadata: ChunkMetadata,
}

/// A chunk paired with its embedding, ready for storage
///
/// The store rejects chunks whose embedding is empty; a stored chunk always
/// carries a vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The chunk being stored
    pub chunk: DocumentChunk,
    /// Embedding vector for the chunk text
    pub embedding: Vec<f32>,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Chunk text
    pub content: String,
    /// Source metadata as stored at ingest time
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query (smaller is closer)
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_json_shape() {
        let metadata = ChunkMetadata {
            source: "document.pdf".to_string(),
            page: Some(3),
            chunk_index: 7,
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["source"], "document.pdf");
        assert_eq!(json["page"], 3);
        assert_eq!(json["chunk_index"], 7);
    }

    #[test]
    fn test_metadata_roundtrip_without_page() {
        let metadata = ChunkMetadata {
            source: "document.pdf".to_string(),
            page: None,
            chunk_index: 0,
        };

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("page"));

        let back: ChunkMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
