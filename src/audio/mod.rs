//! Audio extraction from downloaded video files.
//!
//! Derives an MP3 track from a video using ffmpeg.

use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// The path an extracted audio track is written to: the video path with an
/// mp3 extension.
pub fn audio_path_for(video_path: &Path) -> PathBuf {
    video_path.with_extension("mp3")
}

/// Trait for audio extraction implementations.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract the audio track of `video_path` into a sibling file and
    /// return its path. Re-running overwrites the same destination.
    async fn extract(&self, video_path: &Path) -> Result<PathBuf>;
}

/// ffmpeg-based audio extractor.
pub struct FfmpegExtractor;

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    #[instrument(skip(self), fields(video = %video_path.display()))]
    async fn extract(&self, video_path: &Path) -> Result<PathBuf> {
        if !video_path.exists() {
            return Err(SvarError::Extraction(format!(
                "Video file does not exist: {}",
                video_path.display()
            )));
        }

        let dest = audio_path_for(video_path);
        debug!("Extracting audio to {:?}", dest);

        let result = Command::new("ffmpeg")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-codec:a")
            .arg("libmp3lame")
            .arg("-qscale:a")
            .arg("2")
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg(&dest)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => Ok(dest),
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                Err(SvarError::Extraction(format!(
                    "ffmpeg failed for {}: {}",
                    video_path.display(),
                    err.trim()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SvarError::ToolNotFound("ffmpeg".into()))
            }
            Err(e) => Err(SvarError::Extraction(format!("ffmpeg error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_path_derivation() {
        assert_eq!(
            audio_path_for(Path::new("/videos/DAbC123.mp4")),
            PathBuf::from("/videos/DAbC123.mp3")
        );
        assert_eq!(
            audio_path_for(Path::new("clip.webm")),
            PathBuf::from("clip.mp3")
        );
    }

    #[tokio::test]
    async fn test_missing_video_is_an_extraction_error() {
        let extractor = FfmpegExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/clip.mp4")).await;
        assert!(matches!(result, Err(SvarError::Extraction(_))));
    }
}
