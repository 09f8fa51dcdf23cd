// InfoExtractor trait and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resolver::errors::ExtractError;
use crate::resolver::models::SelectionConstraints;

/// Extraction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorMode {
    /// Python module yt_dlp (better for YouTube, avoids bot detection)
    Python,
    /// CLI binary yt-dlp (faster, no Python dependency)
    Cli,
    /// Python first for YouTube, CLI first elsewhere, then the other one
    #[default]
    Auto,
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Cli => write!(f, "cli"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Configuration for info extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// Path to cookies.txt file
    pub cookies_path: Option<String>,
    /// Use cookies from browser (Chrome)
    pub cookies_from_browser: bool,
    /// yt-dlp socket timeout in seconds
    pub timeout_seconds: u64,
    /// Wall-clock limit for one yt-dlp run
    pub process_timeout_seconds: u64,
    /// Limit for the whole extraction, fallbacks included
    pub overall_timeout_seconds: u64,
    /// YouTube player client (android, web, tv)
    pub player_client: Option<String>,
    /// yt-dlp `-f` expression; derived from the preferred containers when unset
    pub format: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Auto,
            proxy: None,
            cookies_path: None,
            cookies_from_browser: false,
            timeout_seconds: 30,
            process_timeout_seconds: 60,
            overall_timeout_seconds: 90,
            player_client: None,
            format: None,
        }
    }
}

impl ExtractorConfig {
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_cookies_path(mut self, path: Option<String>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_cookies_from_browser(mut self, enabled: bool) -> Self {
        self.cookies_from_browser = enabled;
        self
    }

    pub fn with_mode(mut self, mode: ExtractorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_player_client(mut self, client: Option<String>) -> Self {
        self.player_client = client;
        self
    }

    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    pub fn uses_cookies(&self) -> bool {
        self.cookies_path.is_some() || self.cookies_from_browser
    }

    /// `-f` value passed to yt-dlp
    pub fn format_expression(&self) -> String {
        self.format.clone().unwrap_or_else(|| {
            audio_format_expression(&SelectionConstraints::streaming().preferred_containers)
        })
    }
}

/// `bestaudio[ext=m4a]/bestaudio[ext=mp3]/.../bestaudio[acodec^=mp4a]/bestaudio`
pub fn audio_format_expression(containers: &[String]) -> String {
    let mut parts: Vec<String> = containers
        .iter()
        .map(|ext| format!("bestaudio[ext={}]", ext))
        .collect();
    parts.push("bestaudio[acodec^=mp4a]".to_string());
    parts.push("bestaudio".to_string());
    parts.join("/")
}

pub fn is_youtube_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("youtube.com") || lower.contains("youtu.be")
}

/// Arguments shared by the CLI and Python runners, URL last
pub fn ytdlp_args(url: &str, config: &ExtractorConfig, player_client: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "--dump-json".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--no-check-certificates".to_string(),
        "-f".to_string(),
        config.format_expression(),
        "--socket-timeout".to_string(),
        config.timeout_seconds.to_string(),
        "--retries".to_string(),
        "2".to_string(),
    ];

    if let Some(client) = player_client {
        args.push("--extractor-args".to_string());
        args.push(format!("youtube:player_client={}", client));
    }

    if let Some(path) = &config.cookies_path {
        args.push("--cookies".to_string());
        args.push(path.clone());
    } else if config.cookies_from_browser {
        args.push("--cookies-from-browser".to_string());
        args.push("chrome".to_string());
    }

    if let Some(proxy) = &config.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    args.push(url.to_string());
    args
}

/// First JSON object printed by `--dump-json`
pub fn parse_dump(stdout: &[u8]) -> Result<serde_json::Value, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| ExtractError::Parse("yt-dlp printed no JSON".to_string()))?;

    serde_json::from_str(line).map_err(|e| ExtractError::Parse(format!("invalid JSON: {}", e)))
}

/// Trait for info extractors
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Check if this extractor is available
    fn is_available(&self) -> bool;

    /// Raw provider record for a single item
    async fn extract(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<serde_json::Value, ExtractError>;
}
