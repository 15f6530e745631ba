//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large datasets, consider using sqlite-vec
//! or a dedicated vector database.

use super::{cosine_similarity, Document, IndexStamp, IndexedMedia, SearchResult, VectorStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    media_id TEXT NOT NULL,
    source_file TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_media_id ON chunks(media_id);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better behavior under a concurrent reader
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SvarError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(Document {
            id: row.get(0)?,
            media_id: row.get(1)?,
            source_file: row.get(2)?,
            chunk_index: row.get(3)?,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, doc))]
    async fn upsert(&self, doc: &Document) -> Result<()> {
        let conn = self.lock()?;

        let embedding_bytes = Self::embedding_to_bytes(&doc.embedding);

        conn.execute(
            r#"
            INSERT OR REPLACE INTO chunks
            (id, media_id, source_file, chunk_index, content, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                doc.id,
                doc.media_id,
                doc.source_file,
                doc.chunk_index,
                doc.content,
                embedding_bytes,
                doc.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Upserted chunk {}", doc.id);
        Ok(())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, media_id, source_file, chunk_index, content, embedding, indexed_at
            FROM chunks
            "#,
        )?;

        let docs = stmt.query_map([], Self::row_to_document)?;

        let mut results: Vec<SearchResult> = docs
            .filter_map(|doc_result| doc_result.ok())
            .map(|doc| {
                let score = cosine_similarity(query_embedding, &doc.embedding);
                SearchResult {
                    document: doc,
                    score,
                }
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn prune_chunks(&self, media_id: &str, keep_count: u32) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE media_id = ?1 AND chunk_index >= ?2",
            params![media_id, keep_count],
        )?;

        if deleted > 0 {
            info!("Pruned {} stale chunks for media {}", deleted, media_id);
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn get_by_media_id(&self, media_id: &str) -> Result<Vec<Document>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, media_id, source_file, chunk_index, content, embedding, indexed_at
            FROM chunks
            WHERE media_id = ?1
            ORDER BY chunk_index
            "#,
        )?;

        let docs = stmt.query_map(params![media_id], Self::row_to_document)?;
        let result: Vec<Document> = docs.filter_map(|d| d.ok()).collect();

        debug!("Found {} chunks for media {}", result.len(), media_id);
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn list_media(&self) -> Result<Vec<IndexedMedia>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT media_id, source_file, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM chunks
            GROUP BY media_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let media = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(3)?;
            Ok(IndexedMedia {
                media_id: row.get(0)?,
                source_file: row.get(1)?,
                chunk_count: row.get(2)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<IndexedMedia> = media.filter_map(|m| m.ok()).collect();
        Ok(result)
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<IndexStamp>> {
        let conn = self.lock()?;

        let model = conn.query_row(
            "SELECT value FROM index_meta WHERE key = 'embedding_model'",
            [],
            |row| row.get::<_, String>(0),
        );

        let model = match model {
            Ok(m) => m,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let dimensions: String = conn.query_row(
            "SELECT value FROM index_meta WHERE key = 'embedding_dimensions'",
            [],
            |row| row.get(0),
        )?;

        let dimensions = dimensions
            .parse::<usize>()
            .map_err(|_| SvarError::VectorStore("Corrupt embedding_dimensions value".into()))?;

        Ok(Some(IndexStamp { model, dimensions }))
    }

    async fn record_embedding_model(&self, stamp: &IndexStamp) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('embedding_model', ?1)",
            params![stamp.model],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('embedding_dimensions', ?1)",
            params![stamp.dimensions.to_string()],
        )?;

        info!(
            "Stamped index with embedding model {} ({}d)",
            stamp.model, stamp.dimensions
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        debug!("Flushed vector store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(media_id: &str, index: u32, content: &str, embedding: Vec<f32>) -> Document {
        Document::new(
            media_id.to_string(),
            format!("{}.mp4", media_id),
            index,
            content.to_string(),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert(&doc("1", 0, "Paris is the capital of France.", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(&doc("1", 1, "Oslo is the capital of Norway.", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();

        assert_eq!(store.document_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "1_chunk_0");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_upsert_same_id_replaces() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store.upsert(&doc("42", 0, "old text", vec![1.0])).await.unwrap();
        store.upsert(&doc("42", 0, "new text", vec![1.0])).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 1);
        let docs = store.get_by_media_id("42").await.unwrap();
        assert_eq!(docs[0].content, "new text");
    }

    #[tokio::test]
    async fn test_prune_chunks_removes_stale_tail() {
        let store = SqliteVectorStore::in_memory().unwrap();

        for i in 0..4 {
            store
                .upsert(&doc("42", i, &format!("chunk {}", i), vec![1.0]))
                .await
                .unwrap();
        }

        let pruned = store.prune_chunks("42", 2).await.unwrap();
        assert_eq!(pruned, 2);

        let remaining = store.get_by_media_id("42").await.unwrap();
        let ids: Vec<&str> = remaining.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["42_chunk_0", "42_chunk_1"]);
    }

    #[tokio::test]
    async fn test_list_media_groups_by_media_id() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store.upsert(&doc("a", 0, "x", vec![1.0])).await.unwrap();
        store.upsert(&doc("a", 1, "y", vec![1.0])).await.unwrap();
        store.upsert(&doc("b", 0, "z", vec![1.0])).await.unwrap();

        let media = store.list_media().await.unwrap();
        assert_eq!(media.len(), 2);
        let a = media.iter().find(|m| m.media_id == "a").unwrap();
        assert_eq!(a.chunk_count, 2);
        assert_eq!(a.source_file, "a.mp4");
    }

    #[tokio::test]
    async fn test_embedding_model_stamp_roundtrip() {
        let store = SqliteVectorStore::in_memory().unwrap();

        assert!(store.embedding_model().await.unwrap().is_none());

        let stamp = IndexStamp {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
        };
        store.record_embedding_model(&stamp).await.unwrap();

        assert_eq!(store.embedding_model().await.unwrap(), Some(stamp));
    }
}
