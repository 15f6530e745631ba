//! OpenAI transcription implementation.

use super::Transcriber;
use crate::error::{Result, SvarError};
use crate::openai::{create_client, with_retry};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// OpenAI-based transcriber.
///
/// Transcription is a slow remote call with a transient failure mode, so
/// every request runs under the shared bounded-retry policy. Auth and quota
/// failures surface immediately.
pub struct OpenAiTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_attempts: u32,
}

impl OpenAiTranscriber {
    /// Create a new transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config("gpt-4o-transcribe", crate::openai::DEFAULT_MAX_ATTEMPTS)
    }

    /// Create a new transcriber with a custom model and retry budget.
    pub fn with_config(model: &str, max_attempts: u32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            max_attempts,
        }
    }
}

impl Default for OpenAiTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        debug!("Transcribing audio with {}", self.model);

        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let response = with_retry(self.max_attempts, || {
            let bytes = file_bytes.clone();
            let name = file_name.clone();
            async move {
                let request = CreateTranscriptionRequestArgs::default()
                    .file(AudioInput::from_vec_u8(name, bytes))
                    .model(&self.model)
                    .response_format(AudioResponseFormat::Json)
                    .build()?;

                self.client.audio().transcribe(request).await
            }
        })
        .await
        .map_err(|e| SvarError::Transcription(format!("{} API error: {}", self.model, e)))?;

        Ok(response.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcriber_config() {
        // Just verify construction (no API call)
        let transcriber = OpenAiTranscriber::with_config("test-model", 5);
        assert_eq!(transcriber.model, "test-model");
        assert_eq!(transcriber.max_attempts, 5);
    }
}
