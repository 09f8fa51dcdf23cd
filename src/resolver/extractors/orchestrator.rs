// InfoExtractor Orchestrator - mode selection and fallback
//
// Strategy:
// 1. YouTube: Python mode first (better anti-bot bypass)
// 2. Other sites: CLI mode first (faster)
// 3. Fall back to the other mode when the failure is worth retrying

use std::sync::Arc;

use async_trait::async_trait;

use super::cli::CliInfoExtractor;
use super::python::PythonInfoExtractor;
use super::traits::{is_youtube_url, ExtractorConfig, ExtractorMode, InfoExtractor};
use crate::resolver::errors::ExtractError;

/// Orchestrator that manages Python and CLI extractors
pub struct InfoExtractorOrchestrator {
    python: Arc<dyn InfoExtractor>,
    cli: Arc<dyn InfoExtractor>,
}

impl InfoExtractorOrchestrator {
    pub fn new() -> Self {
        Self::with_extractors(
            Arc::new(PythonInfoExtractor::new()),
            Arc::new(CliInfoExtractor::new()),
        )
    }

    pub fn with_extractors(python: Arc<dyn InfoExtractor>, cli: Arc<dyn InfoExtractor>) -> Self {
        Self { python, cli }
    }

    /// Preferred concrete mode for `url`, ignoring availability
    pub fn preferred_order(url: &str) -> [ExtractorMode; 2] {
        if is_youtube_url(url) {
            [ExtractorMode::Python, ExtractorMode::Cli]
        } else {
            [ExtractorMode::Cli, ExtractorMode::Python]
        }
    }

    fn extractor(&self, mode: ExtractorMode) -> &Arc<dyn InfoExtractor> {
        match mode {
            ExtractorMode::Python => &self.python,
            _ => &self.cli,
        }
    }

    /// `is_available` spawns a process, so it runs on the blocking pool
    async fn check_available(extractor: &Arc<dyn InfoExtractor>) -> bool {
        let extractor = Arc::clone(extractor);
        tokio::task::spawn_blocking(move || extractor.is_available())
            .await
            .unwrap_or(false)
    }

    async fn extract_auto(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<serde_json::Value, ExtractError> {
        let mut last_error: Option<ExtractError> = None;

        for mode in Self::preferred_order(url) {
            let extractor = self.extractor(mode);
            if !Self::check_available(extractor).await {
                tracing::debug!(%mode, extractor = extractor.name(), "extractor unavailable, skipping");
                continue;
            }

            tracing::info!(%mode, youtube = is_youtube_url(url), "trying extractor");
            match extractor.extract(url, config).await {
                Ok(record) => return Ok(record),
                Err(e) => {
                    tracing::warn!(
                        %mode,
                        error = %e,
                        reason = ?e.blocking_reason(),
                        "extractor failed"
                    );
                    let retry = e.is_retryable();
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExtractError::ToolNotFound(
                "neither python yt_dlp nor the yt-dlp binary is available".to_string(),
            )
        }))
    }
}

impl Default for InfoExtractorOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfoExtractor for InfoExtractorOrchestrator {
    fn name(&self) -> &'static str {
        "orchestrator"
    }

    fn is_available(&self) -> bool {
        self.python.is_available() || self.cli.is_available()
    }

    async fn extract(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<serde_json::Value, ExtractError> {
        match config.mode {
            ExtractorMode::Auto => self.extract_auto(url, config).await,
            mode => self.extractor(mode).extract(url, config).await,
        }
    }
}
