//! Configuration settings for Svar.

use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder values that must be replaced before ingestion can run.
const PLACEHOLDER_VALUES: &[&str] = &[
    "your_username",
    "your_password",
    "target_account",
    "changeme",
];

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub instagram: InstagramSettings,
    pub transcription: TranscriptionSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub rag: RagSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for downloaded video files.
    pub video_dir: String,
    /// Directory for transcript text files.
    pub transcript_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.svar".to_string(),
            video_dir: "~/.svar/videos".to_string(),
            transcript_dir: "~/.svar/transcripts".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Instagram account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstagramSettings {
    /// Login username (required for non-public accounts).
    pub username: String,
    /// Login password.
    pub password: String,
    /// Account whose posts are ingested.
    pub target_account: String,
    /// Timeout for listing and download subprocess calls.
    pub download_timeout_seconds: u64,
}

impl Default for InstagramSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            target_account: String::new(),
            download_timeout_seconds: 300,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Transcription model to use.
    pub model: String,
    /// Maximum attempts per transcription call (transient failures only).
    pub max_attempts: u32,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-transcribe".to_string(),
            max_attempts: 3,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-large".to_string(),
            dimensions: 3072,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunk size in characters.
    pub chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 500 }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to the SQLite database file.
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.svar/index.db".to_string(),
        }
    }
}

/// RAG (Retrieval-Augmented Generation) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Default number of context chunks to retrieve.
    pub top_k: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            top_k: 3,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SvarError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svar")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded video directory path.
    pub fn video_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.video_dir)
    }

    /// Get the expanded transcript directory path.
    pub fn transcript_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.transcript_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Validate that the settings are usable for ingestion.
    ///
    /// Ingestion refuses to run against an unset or placeholder target
    /// account, and with a zero chunk size.
    pub fn validate_for_ingestion(&self) -> Result<()> {
        let account = self.instagram.target_account.trim();
        if account.is_empty() {
            return Err(SvarError::Config(
                "instagram.target_account is not set; edit your config before running an update"
                    .to_string(),
            ));
        }
        if Self::is_placeholder(account) {
            return Err(SvarError::Config(format!(
                "instagram.target_account is still the placeholder value '{}'",
                account
            )));
        }
        for (key, value) in [
            ("instagram.username", &self.instagram.username),
            ("instagram.password", &self.instagram.password),
        ] {
            if Self::is_placeholder(value.trim()) {
                return Err(SvarError::Config(format!(
                    "{} is still a placeholder value; set real credentials or leave it empty",
                    key
                )));
            }
        }
        if self.chunking.chunk_size == 0 {
            return Err(SvarError::Config(
                "chunking.chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn is_placeholder(value: &str) -> bool {
        PLACEHOLDER_VALUES
            .iter()
            .any(|p| value.eq_ignore_ascii_case(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_refuse_ingestion() {
        let settings = Settings::default();
        assert!(settings.validate_for_ingestion().is_err());
    }

    #[test]
    fn test_placeholder_account_refused() {
        let mut settings = Settings::default();
        settings.instagram.target_account = "target_account".to_string();
        assert!(settings.validate_for_ingestion().is_err());
    }

    #[test]
    fn test_placeholder_credentials_refused() {
        let mut settings = Settings::default();
        settings.instagram.target_account = "cooking_daily".to_string();
        settings.instagram.username = "your_username".to_string();
        assert!(settings.validate_for_ingestion().is_err());
    }

    #[test]
    fn test_real_account_accepted() {
        let mut settings = Settings::default();
        settings.instagram.target_account = "cooking_daily".to_string();
        assert!(settings.validate_for_ingestion().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_refused() {
        let mut settings = Settings::default();
        settings.instagram.target_account = "cooking_daily".to_string();
        settings.chunking.chunk_size = 0;
        assert!(settings.validate_for_ingestion().is_err());
    }

    #[test]
    fn test_roundtrip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.embedding.model, settings.embedding.model);
        assert_eq!(parsed.chunking.chunk_size, 500);
        assert_eq!(parsed.rag.top_k, 3);
    }
}
