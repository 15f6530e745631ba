//! The question-answering engine.

use super::{build_context, build_user_prompt, ContextChunk, Generator, RAG_SYSTEM_PROMPT};
use crate::embedding::Embedder;
use crate::error::{Result, RetrievalStage, SvarError};
use crate::vector_store::{ensure_embedding_model, IndexStamp, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// RAG engine for question answering.
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl RagEngine {
    /// Create a new RAG engine over a store, embedder, and generator.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
        }
    }

    /// Answer a question from the indexed transcripts.
    ///
    /// Embeds the question, retrieves the `top_k` most similar chunks, and
    /// asks the generation model to answer strictly from their text. Fails
    /// with [`SvarError::EmptyIndex`] when nothing has been ingested yet;
    /// each later stage failure names the stage it occurred in.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer(&self, question: &str, top_k: usize) -> Result<AnswerResult> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SvarError::InvalidInput("Question is empty".to_string()));
        }
        if top_k == 0 {
            return Err(SvarError::InvalidInput("top_k must be at least 1".to_string()));
        }

        info!("Answering question with top_k={}", top_k);

        let count = self
            .store
            .document_count()
            .await
            .map_err(|e| retrieval_error(RetrievalStage::Search, e))?;
        if count == 0 {
            return Err(SvarError::EmptyIndex);
        }

        let stamp = IndexStamp {
            model: self.embedder.model_id().to_string(),
            dimensions: self.embedder.dimensions(),
        };
        ensure_embedding_model(self.store.as_ref(), &stamp).await?;

        let query_embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| retrieval_error(RetrievalStage::QueryEmbedding, e))?;

        let results = self
            .store
            .search(&query_embedding, top_k)
            .await
            .map_err(|e| retrieval_error(RetrievalStage::Search, e))?;

        let sources: Vec<ContextChunk> = results.into_iter().map(ContextChunk::from).collect();
        debug!("Retrieved {} context chunks", sources.len());

        let context = build_context(&sources);
        let user_prompt = build_user_prompt(&context, question);

        let answer = self.generator.generate(RAG_SYSTEM_PROMPT, &user_prompt).await?;

        Ok(AnswerResult { answer, sources })
    }
}

fn retrieval_error(stage: RetrievalStage, err: SvarError) -> SvarError {
    match err {
        already @ SvarError::Retrieval { .. } => already,
        other => SvarError::Retrieval {
            stage,
            message: other.to_string(),
        },
    }
}

/// An answer with the context chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    /// The generated answer.
    pub answer: String,
    /// Retrieved chunks, in rank order.
    pub sources: Vec<ContextChunk>,
}

impl AnswerResult {
    /// Format the answer and its sources for terminal display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} [chunk {}] (score: {:.2})",
                    source.source_file, source.chunk_index, source.score
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::vector_store::{Document, MemoryVectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embedder that maps known phrases onto fixed unit vectors.
    struct PhraseEmbedder;

    #[async_trait]
    impl Embedder for PhraseEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.to_lowercase().contains("france") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "phrase-embedder"
        }
    }

    /// Generator that records the prompt it was handed.
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingGenerator {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok("Paris.".to_string())
        }
    }

    fn engine_with_store(store: Arc<MemoryVectorStore>) -> (RagEngine, Arc<RecordingGenerator>) {
        let generator = Arc::new(RecordingGenerator::new());
        let engine = RagEngine::new(store, Arc::new(PhraseEmbedder), generator.clone());
        (engine, generator)
    }

    #[tokio::test]
    async fn test_empty_index_is_an_error() {
        let (engine, _) = engine_with_store(Arc::new(MemoryVectorStore::new()));

        let result = engine.answer("What is the capital of France?", 1).await;
        assert!(matches!(result, Err(SvarError::EmptyIndex)));
    }

    #[tokio::test]
    async fn test_answer_retrieves_and_grounds_on_context() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&Document::new(
                "1".to_string(),
                "1.mp4".to_string(),
                0,
                "Paris is the capital of France.".to_string(),
                vec![1.0, 0.0],
            ))
            .await
            .unwrap();
        store
            .upsert(&Document::new(
                "2".to_string(),
                "2.mp4".to_string(),
                0,
                "The recipe needs two eggs.".to_string(),
                vec![0.0, 1.0],
            ))
            .await
            .unwrap();

        let (engine, generator) = engine_with_store(store);

        let result = engine
            .answer("What is the capital of France?", 1)
            .await
            .unwrap();

        assert_eq!(result.answer, "Paris.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].media_id, "1");
        assert_eq!(result.sources[0].chunk_index, 0);

        // The generator saw the retrieved chunk, nothing else
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Paris is the capital of France."));
        assert!(!prompts[0].contains("two eggs"));
    }

    #[tokio::test]
    async fn test_blank_question_is_invalid() {
        let (engine, _) = engine_with_store(Arc::new(MemoryVectorStore::new()));
        let result = engine.answer("   ", 3).await;
        assert!(matches!(result, Err(SvarError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_mismatched_index_is_refused() {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&Document::new(
                "1".to_string(),
                "1.mp4".to_string(),
                0,
                "text".to_string(),
                vec![1.0, 0.0],
            ))
            .await
            .unwrap();
        store
            .record_embedding_model(&IndexStamp {
                model: "another-model".to_string(),
                dimensions: 4,
            })
            .await
            .unwrap();

        let (engine, _) = engine_with_store(store);
        let result = engine.answer("anything?", 1).await;
        assert!(matches!(
            result,
            Err(SvarError::EmbeddingModelMismatch { .. })
        ));
    }
}
