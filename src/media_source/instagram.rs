//! Instagram source implementation.
//!
//! Lists and downloads an account's posts through yt-dlp, which handles the
//! actual Instagram protocol.

use super::{MediaItem, MediaKind, MediaSource};
use crate::config::InstagramSettings;
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Instagram media source backed by yt-dlp.
pub struct InstagramSource {
    settings: InstagramSettings,
    handle_regex: Regex,
    shortcode_regex: Regex,
}

impl InstagramSource {
    pub fn new(settings: InstagramSettings) -> Self {
        // Instagram handles: letters, digits, dots, underscores, max 30 chars
        let handle_regex = Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("Invalid regex");
        // Post URLs carry the shortcode after /reel/, /p/ or /tv/
        let shortcode_regex =
            Regex::new(r"instagram\.com/(?:reel|reels|p|tv)/([A-Za-z0-9_-]+)").expect("Invalid regex");

        Self {
            settings,
            handle_regex,
            shortcode_regex,
        }
    }

    /// Extract the post shortcode from a post URL.
    fn extract_shortcode(&self, url: &str) -> Option<String> {
        self.shortcode_regex
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Classify a post by its URL path. Reels and IGTV are videos; plain
    /// posts may be image carousels and are left for the caller to skip.
    fn classify(url: &str) -> MediaKind {
        if url.contains("/reel/") || url.contains("/reels/") || url.contains("/tv/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// Credential flags for yt-dlp, when configured.
    fn credential_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.settings.username.is_empty() {
            args.push("--username".to_string());
            args.push(self.settings.username.clone());
            args.push("--password".to_string());
            args.push(self.settings.password.clone());
        }
        args
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.download_timeout_seconds)
    }
}

#[async_trait]
impl MediaSource for InstagramSource {
    #[instrument(skip(self))]
    async fn recent_media(&self, account: &str, limit: usize) -> Result<Vec<MediaItem>> {
        if !self.handle_regex.is_match(account) {
            return Err(SvarError::InvalidInput(format!(
                "Not a valid account handle: {}",
                account
            )));
        }

        let profile_url = format!("https://www.instagram.com/{}/", account);
        info!("Listing up to {} posts for {}", limit, account);

        let mut cmd = Command::new("yt-dlp");
        cmd.args([
            "--dump-json",
            "--no-download",
            "--no-warnings",
            "--flat-playlist",
            "--playlist-end",
            &limit.to_string(),
        ])
        .args(self.credential_args())
        .arg(&profile_url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let result = tokio::time::timeout(self.timeout(), cmd.output())
            .await
            .map_err(|_| SvarError::Fetch(format!("Listing {} timed out", account)))?;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SvarError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(SvarError::Fetch(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SvarError::Fetch(format!(
                "Failed to list posts for {}: {}",
                account, stderr
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut items = Vec::new();

        for line in stdout.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let Ok(json) = serde_json::from_str::<serde_json::Value>(line) else {
                continue;
            };

            let url = json["url"]
                .as_str()
                .or_else(|| json["webpage_url"].as_str())
                .unwrap_or_default()
                .to_string();

            let id = self
                .extract_shortcode(&url)
                .or_else(|| json["id"].as_str().map(|s| s.to_string()));

            if let Some(id) = id {
                items.push(MediaItem {
                    kind: Self::classify(&url),
                    id,
                    url,
                });
            }
        }

        debug!("Listed {} posts for {}", items.len(), account);
        Ok(items)
    }

    #[instrument(skip(self, dest_dir), fields(media_id = %item.id))]
    async fn download(&self, item: &MediaItem, dest_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest_dir)?;

        let target_path = dest_dir.join(item.video_file_name());
        if target_path.exists() {
            info!("Using cached video file");
            return Ok(target_path);
        }

        info!("Downloading video from {}", item.url);

        let template = dest_dir.join(format!("{}.%(ext)s", item.id));

        let mut cmd = Command::new("yt-dlp");
        cmd.arg("--remux-video")
            .arg("mp4")
            .arg("--output")
            .arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .args(self.credential_args())
            .arg(&item.url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let result = tokio::time::timeout(self.timeout(), cmd.output())
            .await
            .map_err(|_| SvarError::Download(format!("Download of {} timed out", item.id)))?;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SvarError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(SvarError::Download(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SvarError::Download(format!("yt-dlp failed: {stderr}")));
        }

        find_video_file(dest_dir, &item.id)
    }
}

/// Locates a downloaded video file by media id.
fn find_video_file(dir: &Path, media_id: &str) -> Result<PathBuf> {
    // Container formats yt-dlp may produce when remuxing is not possible
    for ext in &["mp4", "mkv", "webm", "mov"] {
        let candidate = dir.join(format!("{}.{}", media_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| SvarError::Download(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(media_id) {
            return Ok(entry.path());
        }
    }

    Err(SvarError::Download(
        "Video file not found after download".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> InstagramSource {
        InstagramSource::new(InstagramSettings::default())
    }

    #[test]
    fn test_extract_shortcode() {
        let src = source();

        assert_eq!(
            src.extract_shortcode("https://www.instagram.com/reel/DAbC12_xyz/"),
            Some("DAbC12_xyz".to_string())
        );
        assert_eq!(
            src.extract_shortcode("https://www.instagram.com/p/Cxyz987/"),
            Some("Cxyz987".to_string())
        );
        assert_eq!(src.extract_shortcode("https://example.com/watch"), None);
    }

    #[test]
    fn test_classify_posts() {
        assert_eq!(
            InstagramSource::classify("https://www.instagram.com/reel/DAbC123/"),
            MediaKind::Video
        );
        assert_eq!(
            InstagramSource::classify("https://www.instagram.com/tv/DAbC123/"),
            MediaKind::Video
        );
        assert_eq!(
            InstagramSource::classify("https://www.instagram.com/p/DAbC123/"),
            MediaKind::Other
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_handle() {
        let src = source();
        let result = src.recent_media("not a handle!", 5).await;
        assert!(matches!(result, Err(SvarError::InvalidInput(_))));
    }

    #[test]
    fn test_credential_args_empty_without_login() {
        assert!(source().credential_args().is_empty());
    }

    #[test]
    fn test_credential_args_with_login() {
        let mut settings = InstagramSettings::default();
        settings.username = "user".to_string();
        settings.password = "pass".to_string();
        let args = InstagramSource::new(settings).credential_args();
        assert_eq!(args, vec!["--username", "user", "--password", "pass"]);
    }
}
