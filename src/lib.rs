//! Svar - Social Video RAG
//!
//! Svar ingests the video posts of a social-media account, transcribes their
//! audio, and builds a searchable knowledge base you can ask questions about.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Pull the most recent video posts from a configured account
//! - Transcribe their spoken audio and index it as embeddings
//! - Ask questions answered strictly from the indexed transcripts
//! - Serve the same operations over a small HTTP API
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `media_source` - Media source abstraction (account listing, download)
//! - `audio` - Audio extraction from downloaded video
//! - `transcription` - Speech-to-text transcription
//! - `chunking` - Transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `indexing` - Chunk embedding and upsert
//! - `rag` - RAG engine for question answering
//! - `orchestrator` - Ingestion pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use svar::config::Settings;
//! use svar::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     // Ingest the 10 most recent posts of the configured account
//!     let report = orchestrator.run_batch(10).await?;
//!     println!("{}", report.status_line());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexing;
pub mod media_source;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcription;
pub mod vector_store;

pub use error::{Result, SvarError};
