//! Error types for Svar.

use thiserror::Error;

/// The stage of the query path that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStage {
    /// Embedding the question.
    QueryEmbedding,
    /// Searching the vector store.
    Search,
    /// Generating the answer.
    Generation,
}

impl std::fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalStage::QueryEmbedding => write!(f, "query embedding"),
            RetrievalStage::Search => write!(f, "vector search"),
            RetrievalStage::Generation => write!(f, "answer generation"),
        }
    }
}

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media fetch failed: {0}")]
    Fetch(String),

    #[error("Media download failed: {0}")]
    Download(String),

    #[error("Audio extraction failed: {0}")]
    Extraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Index write failed: {0}")]
    Index(String),

    #[error("The index is empty; run an update before querying")]
    EmptyIndex,

    #[error("Retrieval failed during {stage}: {message}")]
    Retrieval {
        stage: RetrievalStage,
        message: String,
    },

    #[error("Embedding model mismatch: index was built with {indexed}, configured model is {configured}")]
    EmbeddingModelMismatch { indexed: String, configured: String },

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
