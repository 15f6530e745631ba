//! Answer generation through a chat completion model.

use crate::error::{Result, RetrievalStage, SvarError};
use crate::openai::{create_client, with_retry, DEFAULT_MAX_ATTEMPTS};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Trait for answer generation backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce one completion for a system + user prompt pair.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI chat-completion generator. One request per answer, no streaming,
/// no conversation state.
pub struct OpenAiGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    /// Create a new generator for the given chat model.
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

fn generation_error(message: impl Into<String>) -> SvarError {
    SvarError::Retrieval {
        stage: RetrievalStage::Generation,
        message: message.into(),
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        debug!("Generating answer with {}", self.model);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| generation_error(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| generation_error(e.to_string()))?
                .into(),
        ];

        let response = with_retry(DEFAULT_MAX_ATTEMPTS, || {
            let messages = messages.clone();
            async move {
                let request = CreateChatCompletionRequestArgs::default()
                    .model(&self.model)
                    .messages(messages)
                    .temperature(0.7)
                    .build()?;

                self.client.chat().create(request).await
            }
        })
        .await
        .map_err(|e| generation_error(format!("Chat API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| generation_error("Empty response from model"))
    }
}
