//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAiEmbedder;
use crate::rag::{OpenAiGenerator, RagEngine};
use crate::vector_store::SqliteVectorStore;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    top_k: usize,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let model = model.unwrap_or_else(|| settings.rag.model.clone());

    let store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);
    let embedder = Arc::new(OpenAiEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));
    let generator = Arc::new(OpenAiGenerator::new(&model));

    let engine = RagEngine::new(store, embedder, generator);

    let spinner = Output::spinner("Searching knowledge base...");

    match engine.answer(question, top_k).await {
        Ok(result) => {
            spinner.finish_and_clear();
            println!("\n{}\n", result.format_for_display());
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
