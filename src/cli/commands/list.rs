//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = SqliteVectorStore::new(&settings.sqlite_path())?;

    match store.list_media().await {
        Ok(media) => {
            if media.is_empty() {
                Output::info("No media indexed yet. Use 'svar update' to ingest posts.");
            } else {
                Output::header(&format!("Indexed Media ({})", media.len()));
                println!();

                for item in &media {
                    Output::media_info(&item.media_id, &item.source_file, item.chunk_count);
                }

                let total_chunks: u32 = media.iter().map(|m| m.chunk_count).sum();
                println!();
                Output::kv("Total items", &media.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list media: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
