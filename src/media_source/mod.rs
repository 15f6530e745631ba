//! Media source abstraction for Svar.
//!
//! Provides a trait-based interface for listing and downloading an account's
//! recent posts.

mod instagram;

pub use instagram::InstagramSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of a media post. Only videos are eligible for ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Other,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// One post candidate for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier from the source.
    pub id: String,
    /// Kind of post.
    pub kind: MediaKind,
    /// URL of the post.
    pub url: String,
}

impl MediaItem {
    /// The file name the downloaded video is stored under.
    pub fn video_file_name(&self) -> String {
        format!("{}.mp4", self.id)
    }
}

/// Trait for media source providers.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// List up to `limit` of the account's most recent posts, newest first.
    async fn recent_media(&self, account: &str, limit: usize) -> Result<Vec<MediaItem>>;

    /// Download a post's video asset into `dest_dir` and return its path.
    async fn download(&self, item: &MediaItem, dest_dir: &Path) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_file_name() {
        let item = MediaItem {
            id: "DAbC123".to_string(),
            kind: MediaKind::Video,
            url: "https://www.instagram.com/reel/DAbC123/".to_string(),
        };
        assert_eq!(item.video_file_name(), "DAbC123.mp4");
    }
}
