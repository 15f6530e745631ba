//! RAG (Retrieval-Augmented Generation) for question answering.
//!
//! Retrieves the transcript chunks most relevant to a question and asks a
//! generation model to answer strictly from them.

mod engine;
mod generator;

pub use engine::{AnswerResult, RagEngine};
pub use generator::{Generator, OpenAiGenerator};

use crate::vector_store::SearchResult;

/// System prompt for answer generation.
pub const RAG_SYSTEM_PROMPT: &str = "You answer questions about an account's video \
transcripts. Use only the context supplied in the user message. If the context does \
not contain the answer, say that you don't know. Never use outside knowledge.";

/// A retrieved chunk used as answer context.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Media item the chunk came from.
    pub media_id: String,
    /// File name of the source video.
    pub source_file: String,
    /// Position of the chunk within its transcript.
    pub chunk_index: u32,
    /// Chunk text.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            media_id: result.document.media_id,
            source_file: result.document.source_file,
            chunk_index: result.document.chunk_index,
            content: result.document.content,
            score: result.score,
        }
    }
}

/// Join retrieved chunk texts into one context block, in rank order.
pub fn build_context(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user prompt embedding the context block and the question.
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using only the context below:\n{}\n\nQuestion: {}",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> ContextChunk {
        ContextChunk {
            media_id: "1".to_string(),
            source_file: "1.mp4".to_string(),
            chunk_index: 0,
            content: content.to_string(),
            score: 1.0,
        }
    }

    #[test]
    fn test_build_context_joins_in_rank_order() {
        let chunks = vec![chunk("most relevant"), chunk("second"), chunk("third")];
        assert_eq!(build_context(&chunks), "most relevant\nsecond\nthird");
    }

    #[test]
    fn test_build_user_prompt_embeds_context_and_question() {
        let prompt = build_user_prompt("Paris is the capital of France.", "What is the capital?");
        assert!(prompt.contains("Paris is the capital of France."));
        assert!(prompt.contains("Question: What is the capital?"));
        assert!(prompt.contains("only the context"));
    }
}
