//! Vector store abstraction for Svar.
//!
//! Provides a trait-based interface for the persistent chunk index.
//!
//! Writers are serialized per store, but a query racing an ingestion batch
//! may observe a partially upserted set of chunks: each upsert is atomic on
//! its own and there is no cross-chunk transaction. This is accepted
//! eventual consistency, not an error.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::chunk_id;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transcript chunk persisted in the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Deterministic id, `{media_id}_chunk_{chunk_index}`.
    pub id: String,
    /// Media item this chunk belongs to.
    pub media_id: String,
    /// File name of the source video.
    pub source_file: String,
    /// Position of this chunk within its transcript.
    pub chunk_index: u32,
    /// Chunk text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document. The id is derived from the media id and chunk
    /// index so re-ingestion replaces rather than duplicates.
    pub fn new(
        media_id: String,
        source_file: String,
        chunk_index: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: chunk_id(&media_id, chunk_index),
            media_id,
            source_file,
            chunk_index,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about one indexed media item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedMedia {
    /// Media id.
    pub media_id: String,
    /// File name of the source video.
    pub source_file: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the media item was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// The embedding model an index was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStamp {
    pub model: String,
    pub dimensions: usize,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store one document, replacing any existing document with the same id.
    async fn upsert(&self, doc: &Document) -> Result<()>;

    /// Search for the `limit` most similar documents.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Delete a media item's chunks with `chunk_index >= keep_count`.
    ///
    /// Removes the stale tail left behind when a re-transcription produced
    /// fewer chunks than a previous run. Returns the number of rows deleted.
    async fn prune_chunks(&self, media_id: &str, keep_count: u32) -> Result<usize>;

    /// Get all documents for a media item, ordered by chunk index.
    async fn get_by_media_id(&self, media_id: &str) -> Result<Vec<Document>>;

    /// List all indexed media items.
    async fn list_media(&self) -> Result<Vec<IndexedMedia>>;

    /// Get total document count.
    async fn document_count(&self) -> Result<usize>;

    /// The embedding model this index was built with, if stamped.
    async fn embedding_model(&self) -> Result<Option<IndexStamp>>;

    /// Stamp the index with the embedding model it is built with.
    async fn record_embedding_model(&self, stamp: &IndexStamp) -> Result<()>;

    /// Persist buffered state to durable storage.
    async fn flush(&self) -> Result<()>;
}

/// Verify that `stamp` matches the model the index was built with, stamping
/// a fresh index on first use.
///
/// Index-time and query-time embeddings must come from the same model and
/// dimension, or similarity scores are meaningless.
pub async fn ensure_embedding_model(store: &dyn VectorStore, stamp: &IndexStamp) -> Result<()> {
    match store.embedding_model().await? {
        None => store.record_embedding_model(stamp).await,
        Some(existing) if existing == *stamp => Ok(()),
        Some(existing) => Err(SvarError::EmbeddingModelMismatch {
            indexed: format!("{} ({}d)", existing.model, existing.dimensions),
            configured: format!("{} ({}d)", stamp.model, stamp.dimensions),
        }),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_document_id_is_deterministic() {
        let doc = Document::new(
            "42".to_string(),
            "42.mp4".to_string(),
            3,
            "content".to_string(),
            vec![],
        );
        assert_eq!(doc.id, "42_chunk_3");
    }

    #[tokio::test]
    async fn test_ensure_embedding_model_stamps_and_checks() {
        let store = MemoryVectorStore::new();
        let stamp = IndexStamp {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
        };

        ensure_embedding_model(&store, &stamp).await.unwrap();
        assert_eq!(store.embedding_model().await.unwrap(), Some(stamp.clone()));

        // Same model passes again
        ensure_embedding_model(&store, &stamp).await.unwrap();

        // A different model is refused
        let other = IndexStamp {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        };
        let result = ensure_embedding_model(&store, &other).await;
        assert!(matches!(
            result,
            Err(SvarError::EmbeddingModelMismatch { .. })
        ));
    }
}
