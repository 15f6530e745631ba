//! Transcription module for Svar.
//!
//! Converts extracted audio into plain transcript text through an external
//! speech-to-text service.

mod openai;

pub use openai::OpenAiTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file to plain text.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}
