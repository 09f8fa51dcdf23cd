// CLI InfoExtractor - native `yt-dlp` binary
//
// Faster than Python mode and has no interpreter dependency, but more likely
// to trip YouTube bot detection, so several player clients are tried.

use async_trait::async_trait;

use super::traits::{is_youtube_url, parse_dump, ytdlp_args, ExtractorConfig, InfoExtractor};
use crate::resolver::errors::ExtractError;
use crate::resolver::tools::{locate_binary, runs_ok};
use crate::resolver::utils::run_output_with_timeout;

/// CLI-based info extractor using yt-dlp binary
pub struct CliInfoExtractor {
    ytdlp_path: String,
}

impl CliInfoExtractor {
    pub fn new() -> Self {
        let ytdlp_path = locate_binary("yt-dlp")
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yt-dlp".to_string());
        Self { ytdlp_path }
    }

    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: path.into(),
        }
    }

    /// Player clients to try, in order
    fn player_clients<'a>(url: &str, config: &'a ExtractorConfig) -> Vec<Option<&'a str>> {
        if let Some(client) = config.player_client.as_deref() {
            return vec![Some(client)];
        }
        if !is_youtube_url(url) {
            return vec![None];
        }
        if config.uses_cookies() {
            // Cookies are tied to the web client session
            vec![Some("web"), Some("android")]
        } else {
            vec![Some("android"), Some("tv"), Some("web")]
        }
    }
}

impl Default for CliInfoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfoExtractor for CliInfoExtractor {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    fn is_available(&self) -> bool {
        runs_ok(&self.ytdlp_path, &["--version"])
    }

    async fn extract(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<serde_json::Value, ExtractError> {
        let mut last_error = ExtractError::Execution("no player client to try".to_string());

        for client in Self::player_clients(url, config) {
            let args = ytdlp_args(url, config, client);
            tracing::debug!(
                extractor = self.name(),
                client = client.unwrap_or("default"),
                cmd = %format!("{} {}", self.ytdlp_path, args.join(" ")),
                "running yt-dlp"
            );

            let error = match run_output_with_timeout(
                &self.ytdlp_path,
                args,
                config.process_timeout_seconds,
            )
            .await
            {
                Ok(out) if out.status.success() => {
                    tracing::info!(extractor = self.name(), client = client.unwrap_or("default"), "extraction succeeded");
                    return parse_dump(&out.stdout);
                }
                Ok(out) => ExtractError::from(String::from_utf8_lossy(&out.stderr).into_owned()),
                Err(e) => e,
            };

            tracing::warn!(
                extractor = self.name(),
                client = client.unwrap_or("default"),
                error = %error,
                "yt-dlp attempt failed"
            );

            // Another client will not help against DRM, private items, missing tools
            if !error.is_retryable() || matches!(error, ExtractError::ToolNotFound(_)) {
                return Err(error);
            }
            last_error = error;
        }

        Err(last_error)
    }
}
