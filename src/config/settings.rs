//! Configuration settings for Oppsum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub acquisition: AcquisitionSettings,
    pub transcription: TranscriptionSettings,
    pub summary: SummarySettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files (per-request workdirs live here).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/oppsum".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Settings for the acquisition fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    /// Preferred caption languages, in order.
    pub caption_languages: Vec<String>,
    /// Client-identity variants to try, in order. Names must match the
    /// known yt-dlp player clients; unknown names are skipped with a warning.
    pub client_variants: Vec<String>,
    /// Socket timeout passed to yt-dlp, in seconds.
    pub socket_timeout_seconds: u64,
    /// Minimum randomized delay between download attempts, in seconds.
    pub min_delay_seconds: u64,
    /// Maximum randomized delay between download attempts, in seconds.
    pub max_delay_seconds: u64,
    /// Force IPv4 connectivity (dual-stack hosts often rate-limit IPv6 less
    /// predictably).
    pub force_ipv4: bool,
    /// How many times a variant is retried after a transient network error.
    pub max_network_retries: u32,
    /// Path to a Netscape-format cookie file. The YTDLP_COOKIES environment
    /// variable (the blob itself) takes precedence.
    pub cookies_file: Option<String>,
    /// Proxy URL, may embed credentials. YTDLP_PROXY takes precedence.
    pub proxy_url: Option<String>,
    /// RapidAPI key for the hosted conversion fallback. RAPIDAPI_KEY takes
    /// precedence.
    pub rapidapi_key: Option<String>,
    /// RapidAPI host of the conversion endpoint.
    pub rapidapi_host: String,
    /// Timeout for remote API requests, in seconds.
    pub remote_timeout_seconds: u64,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            caption_languages: vec!["en".to_string(), "en-US".to_string()],
            client_variants: crate::acquisition::DEFAULT_VARIANTS
                .iter()
                .map(|v| v.name.to_string())
                .collect(),
            socket_timeout_seconds: 30,
            min_delay_seconds: 1,
            max_delay_seconds: 5,
            force_ipv4: true,
            max_network_retries: 1,
            cookies_file: None,
            proxy_url: None,
            rapidapi_key: None,
            rapidapi_host: "youtube-mp36.p.rapidapi.com".to_string(),
            remote_timeout_seconds: 60,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum media duration to process (in seconds).
    pub max_duration_seconds: u32,
    /// Maximum concurrent chunk processing.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            chunk_duration_seconds: 120,
            max_duration_seconds: 7200, // 2 hours
            max_concurrent_chunks: 3,
        }
    }
}

/// Summarization assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// The assistant CLI command.
    pub command: String,
    /// Fallback path to the assistant's JS entry point, run via node when the
    /// command itself is not installed. QWEN_NODE_PATH takes precedence.
    pub node_fallback_path: String,
    /// Maximum summary length, passed through to the assistant unchanged.
    pub max_length: u32,
    /// Creativity (sampling temperature), passed through unchanged.
    pub creativity: f32,
    /// Subprocess timeout, in seconds.
    pub timeout_seconds: u64,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            command: "qwen".to_string(),
            node_fallback_path:
                "/usr/local/lib/node_modules/@qwen-code/qwen-code/dist/index.js".to_string(),
            max_length: 1024,
            creativity: 0.3,
            timeout_seconds: 120,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
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

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OppsumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oppsum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.acquisition.socket_timeout_seconds, 30);
        assert_eq!(parsed.transcription.model, "whisper-1");
        assert_eq!(parsed.summary.command, "qwen");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
            [acquisition]
            caption_languages = ["no", "en"]
        "#;
        let settings: Settings = toml::from_str(partial).unwrap();
        assert_eq!(settings.acquisition.caption_languages, vec!["no", "en"]);
        assert_eq!(settings.acquisition.max_network_retries, 1);
        assert_eq!(settings.general.log_level, "info");
    }

    #[test]
    fn test_default_variants_populated() {
        let settings = AcquisitionSettings::default();
        assert!(settings.client_variants.contains(&"web".to_string()));
        assert!(settings.client_variants.len() >= 5);
    }
}
