//! Ingestion pipeline orchestrator.
//!
//! Coordinates the batch flow from account listing to indexing: download,
//! audio extraction, transcription, transcript persistence, chunking, and
//! index writes, with per-item failure isolation.

use crate::audio::{AudioExtractor, FfmpegExtractor};
use crate::chunking::chunk_text;
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::{Result, SvarError};
use crate::indexing::Indexer;
use crate::media_source::{InstagramSource, MediaItem, MediaKind, MediaSource};
use crate::transcription::{OpenAiTranscriber, Transcriber};
use crate::vector_store::{SqliteVectorStore, VectorStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The pipeline step an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    ExtractAudio,
    Transcribe,
    WriteTranscript,
    Chunk,
    Index,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Download => write!(f, "download"),
            Stage::ExtractAudio => write!(f, "audio extraction"),
            Stage::Transcribe => write!(f, "transcription"),
            Stage::WriteTranscript => write!(f, "transcript write"),
            Stage::Chunk => write!(f, "chunking"),
            Stage::Index => write!(f, "indexing"),
        }
    }
}

/// One item's failure, recorded without aborting the batch.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// Media id of the failed item.
    pub media_id: String,
    /// Pipeline stage the failure occurred in.
    pub stage: Stage,
    /// Error message.
    pub message: String,
}

/// Terminal status of one ingestion batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Items fully ingested.
    pub processed: usize,
    /// Items skipped because they are not videos.
    pub skipped: usize,
    /// Items that failed a pipeline stage.
    pub failed: usize,
    /// Whether the batch stopped early on a cancellation request.
    pub cancelled: bool,
    /// Per-item failure details.
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    /// One-line summary of the batch outcome.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "Processed {} item(s), skipped {}, failed {}",
            self.processed, self.skipped, self.failed
        );
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }
}

/// The main orchestrator for the Svar ingestion pipeline.
///
/// Components are explicit dependencies so tests can substitute any of them.
pub struct Orchestrator {
    settings: Settings,
    source: Arc<dyn MediaSource>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    indexer: Indexer,
    store: Arc<dyn VectorStore>,
}

impl Orchestrator {
    /// Create an orchestrator with the default component stack.
    ///
    /// Fails fast on unusable ingestion configuration.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate_for_ingestion()?;

        let source = Arc::new(InstagramSource::new(settings.instagram.clone()));
        let extractor = Arc::new(FfmpegExtractor::new());
        let transcriber = Arc::new(OpenAiTranscriber::with_config(
            &settings.transcription.model,
            settings.transcription.max_attempts,
        ));
        let embedder = Arc::new(OpenAiEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let store = Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        Ok(Self::assemble(
            settings, source, extractor, transcriber, embedder, store,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        source: Arc<dyn MediaSource>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self::assemble(settings, source, extractor, transcriber, embedder, store)
    }

    fn assemble(
        settings: Settings,
        source: Arc<dyn MediaSource>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let indexer = Indexer::new(embedder, store.clone());
        Self {
            settings,
            source,
            extractor,
            transcriber,
            indexer,
            store,
        }
    }

    /// Get a reference to the vector store.
    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Ingest the configured account's most recent posts.
    pub async fn run_batch(&self, limit: usize) -> Result<BatchReport> {
        self.run_batch_cancellable(limit, &AtomicBool::new(false))
            .await
    }

    /// Ingest with a cancellation flag, checked between items (never
    /// mid-item, so no item is left half processed).
    ///
    /// A listing failure aborts the whole batch; every later failure is
    /// confined to its item and recorded in the report. The vector store is
    /// flushed to durable storage once, after the last item.
    #[instrument(skip(self, cancel))]
    pub async fn run_batch_cancellable(
        &self,
        limit: usize,
        cancel: &AtomicBool,
    ) -> Result<BatchReport> {
        let account = self.settings.instagram.target_account.clone();
        let video_dir = self.settings.video_dir();
        std::fs::create_dir_all(&video_dir)?;
        std::fs::create_dir_all(self.settings.transcript_dir())?;

        info!("Fetching up to {} posts for {}", limit, account);
        let items = self.source.recent_media(&account, limit).await?;

        let mut report = BatchReport::default();
        let progress = batch_progress(items.len() as u64);

        for item in &items {
            if cancel.load(Ordering::Relaxed) {
                warn!("Batch cancelled, stopping before media {}", item.id);
                report.cancelled = true;
                break;
            }

            if item.kind != MediaKind::Video {
                info!(media_id = %item.id, "Skipping non-video post");
                report.skipped += 1;
                progress.inc(1);
                continue;
            }

            match self.process_item(item, &video_dir).await {
                Ok(chunks) => {
                    info!(media_id = %item.id, "Ingested {} chunks", chunks);
                    report.processed += 1;
                }
                Err(failure) => {
                    warn!(
                        media_id = %failure.media_id,
                        stage = %failure.stage,
                        "Item failed: {}",
                        failure.message
                    );
                    report.failed += 1;
                    report.failures.push(failure);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.store.flush().await?;

        info!("{}", report.status_line());
        Ok(report)
    }

    /// Run one item through download, extraction, transcription, transcript
    /// persistence, chunking, and indexing, strictly in order.
    async fn process_item(
        &self,
        item: &MediaItem,
        video_dir: &Path,
    ) -> std::result::Result<usize, ItemFailure> {
        let fail = |stage: Stage, e: SvarError| ItemFailure {
            media_id: item.id.clone(),
            stage,
            message: e.to_string(),
        };

        let video_path = self
            .source
            .download(item, video_dir)
            .await
            .map_err(|e| fail(Stage::Download, e))?;

        let audio_path = self
            .extractor
            .extract(&video_path)
            .await
            .map_err(|e| fail(Stage::ExtractAudio, e))?;

        let transcript = self
            .transcriber
            .transcribe(&audio_path)
            .await
            .map_err(|e| fail(Stage::Transcribe, e))?;

        // Persisted before indexing so the transcript survives index failures
        self.write_transcript(&video_path, &transcript)
            .map_err(|e| fail(Stage::WriteTranscript, e))?;

        let chunks = chunk_text(&transcript, self.settings.chunking.chunk_size)
            .map_err(|e| fail(Stage::Chunk, e))?;

        let source_file = video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| item.video_file_name());

        self.indexer
            .index_media(&item.id, &source_file, &chunks)
            .await
            .map_err(|e| fail(Stage::Index, e))
    }

    /// Write the raw transcript next to its siblings, named from the video
    /// file's stem.
    fn write_transcript(&self, video_path: &Path, transcript: &str) -> Result<PathBuf> {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| {
                SvarError::InvalidInput(format!("No file stem in {}", video_path.display()))
            })?;

        let path = self.settings.transcript_dir().join(format!("{}.txt", stem));
        std::fs::write(&path, transcript)?;
        Ok(path)
    }
}

fn batch_progress(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("Processing posts");
    pb
}
