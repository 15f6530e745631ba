//! Configuration module for Svar.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, InstagramSettings, RagSettings,
    ServerSettings, Settings, TranscriptionSettings, VectorStoreSettings,
};
