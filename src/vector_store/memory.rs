//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, Document, IndexStamp, IndexedMedia, SearchResult, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<String, Document>>,
    stamp: RwLock<Option<IndexStamp>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            stamp: RwLock::new(None),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, doc: &Document) -> Result<()> {
        let mut docs = self.documents.write().unwrap();
        docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let docs = self.documents.read().unwrap();

        let mut results: Vec<SearchResult> = docs
            .values()
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult {
                    document: doc.clone(),
                    score,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn prune_chunks(&self, media_id: &str, keep_count: u32) -> Result<usize> {
        let mut docs = self.documents.write().unwrap();
        let initial_len = docs.len();
        docs.retain(|_, doc| !(doc.media_id == media_id && doc.chunk_index >= keep_count));
        Ok(initial_len - docs.len())
    }

    async fn get_by_media_id(&self, media_id: &str) -> Result<Vec<Document>> {
        let docs = self.documents.read().unwrap();
        let mut result: Vec<Document> = docs
            .values()
            .filter(|d| d.media_id == media_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| d.chunk_index);
        Ok(result)
    }

    async fn list_media(&self) -> Result<Vec<IndexedMedia>> {
        let docs = self.documents.read().unwrap();

        let mut media_map: HashMap<String, IndexedMedia> = HashMap::new();

        for doc in docs.values() {
            let entry = media_map
                .entry(doc.media_id.clone())
                .or_insert_with(|| IndexedMedia {
                    media_id: doc.media_id.clone(),
                    source_file: doc.source_file.clone(),
                    chunk_count: 0,
                    indexed_at: doc.indexed_at,
                });

            entry.chunk_count += 1;
            if doc.indexed_at > entry.indexed_at {
                entry.indexed_at = doc.indexed_at;
            }
        }

        let mut media: Vec<IndexedMedia> = media_map.into_values().collect();
        media.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));

        Ok(media)
    }

    async fn document_count(&self) -> Result<usize> {
        let docs = self.documents.read().unwrap();
        Ok(docs.len())
    }

    async fn embedding_model(&self) -> Result<Option<IndexStamp>> {
        Ok(self.stamp.read().unwrap().clone())
    }

    async fn record_embedding_model(&self, stamp: &IndexStamp) -> Result<()> {
        *self.stamp.write().unwrap() = Some(stamp.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let doc1 = Document::new(
            "post1".to_string(),
            "post1.mp4".to_string(),
            0,
            "Hello world".to_string(),
            vec![1.0, 0.0, 0.0],
        );
        let doc2 = Document::new(
            "post1".to_string(),
            "post1.mp4".to_string(),
            1,
            "Goodbye world".to_string(),
            vec![0.0, 1.0, 0.0],
        );

        store.upsert(&doc1).await.unwrap();
        store.upsert(&doc2).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let media = store.list_media().await.unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].chunk_count, 2);

        let pruned = store.prune_chunks("post1", 1).await.unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(store.document_count().await.unwrap(), 1);
    }
}
