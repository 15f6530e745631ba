//! Chunk embedding and index writes.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{ensure_embedding_model, Document, IndexStamp, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Embeds transcript chunks and upserts them into the vector store.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Indexer {
    /// Create a new indexer over an embedder and a store.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Index one media item's transcript chunks.
    ///
    /// Embeddings are generated in one batch call, then each chunk is
    /// upserted individually: one atomic write per entry, no cross-chunk
    /// transaction. Ids derive from `(media_id, chunk_index)`, so re-running
    /// replaces existing rows; chunks beyond the new count are pruned
    /// afterwards so a shorter re-transcription leaves no stale tail.
    ///
    /// Returns the number of chunks indexed.
    #[instrument(skip(self, chunks), fields(media_id = %media_id, chunks = chunks.len()))]
    pub async fn index_media(
        &self,
        media_id: &str,
        source_file: &str,
        chunks: &[String],
    ) -> Result<usize> {
        let stamp = IndexStamp {
            model: self.embedder.model_id().to_string(),
            dimensions: self.embedder.dimensions(),
        };
        ensure_embedding_model(self.store.as_ref(), &stamp).await?;

        if chunks.is_empty() {
            let pruned = self
                .store
                .prune_chunks(media_id, 0)
                .await
                .map_err(index_error)?;
            if pruned > 0 {
                debug!("Empty transcript, removed {} existing chunks", pruned);
            }
            return Ok(0);
        }

        let embeddings = self.embedder.embed_batch(chunks).await?;

        for (i, (text, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let doc = Document::new(
                media_id.to_string(),
                source_file.to_string(),
                i as u32,
                text.clone(),
                embedding,
            );
            self.store.upsert(&doc).await.map_err(index_error)?;
        }

        let pruned = self
            .store
            .prune_chunks(media_id, chunks.len() as u32)
            .await
            .map_err(index_error)?;
        if pruned > 0 {
            debug!("Removed {} stale chunks from a previous run", pruned);
        }

        info!("Indexed {} chunks for media {}", chunks.len(), media_id);
        Ok(chunks.len())
    }
}

/// Store write failures surface as index errors.
fn index_error(err: crate::SvarError) -> crate::SvarError {
    crate::SvarError::Index(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::error::Result;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    /// Deterministic embedder: vector encodes the text length.
    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn model_id(&self) -> &str {
            "stub-embedder"
        }
    }

    fn indexer_with_store() -> (Indexer, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(Arc::new(StubEmbedder), store.clone());
        (indexer, store)
    }

    #[tokio::test]
    async fn test_indexing_is_idempotent() {
        let (indexer, store) = indexer_with_store();
        let chunks = vec!["first chunk".to_string(), "second chunk".to_string()];

        indexer.index_media("42", "42.mp4", &chunks).await.unwrap();
        indexer.index_media("42", "42.mp4", &chunks).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 2);
        let docs = store.get_by_media_id("42").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["42_chunk_0", "42_chunk_1"]);
    }

    #[tokio::test]
    async fn test_reindexing_keeps_latest_content() {
        let (indexer, store) = indexer_with_store();

        indexer
            .index_media("42", "42.mp4", &["old text".to_string()])
            .await
            .unwrap();
        indexer
            .index_media("42", "42.mp4", &["new text".to_string()])
            .await
            .unwrap();

        let docs = store.get_by_media_id("42").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "new text");
    }

    #[tokio::test]
    async fn test_shrinking_reingestion_prunes_stale_tail() {
        let (indexer, store) = indexer_with_store();

        let long = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        indexer.index_media("42", "42.mp4", &long).await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 3);

        let short = vec!["a".to_string()];
        indexer.index_media("42", "42.mp4", &short).await.unwrap();

        let docs = store.get_by_media_id("42").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["42_chunk_0"]);
    }

    #[tokio::test]
    async fn test_empty_transcript_indexes_nothing() {
        let (indexer, store) = indexer_with_store();

        let count = indexer.index_media("42", "42.mp4", &[]).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refuses_foreign_index() {
        let (indexer, store) = indexer_with_store();

        store
            .record_embedding_model(&IndexStamp {
                model: "some-other-model".to_string(),
                dimensions: 8,
            })
            .await
            .unwrap();

        let result = indexer
            .index_media("42", "42.mp4", &["text".to_string()])
            .await;
        assert!(matches!(
            result,
            Err(crate::SvarError::EmbeddingModelMismatch { .. })
        ));
    }
}
