// Python InfoExtractor - `python3 -m yt_dlp`
//
// Better at getting past YouTube bot detection and works well with cookies.
// Needs Python 3 with the yt_dlp module installed.

use async_trait::async_trait;

use super::traits::{is_youtube_url, parse_dump, ytdlp_args, ExtractorConfig, InfoExtractor};
use crate::resolver::errors::ExtractError;
use crate::resolver::tools::runs_ok;
use crate::resolver::utils::run_output_with_timeout;

/// Interpreter override
pub const PYTHON_ENV: &str = "YTDLP_PYTHON";

/// Python-based info extractor using yt_dlp module
pub struct PythonInfoExtractor {
    python_cmd: String,
}

impl PythonInfoExtractor {
    pub fn new() -> Self {
        Self {
            python_cmd: Self::find_python(),
        }
    }

    pub fn with_interpreter(cmd: impl Into<String>) -> Self {
        Self {
            python_cmd: cmd.into(),
        }
    }

    fn find_python() -> String {
        if let Ok(custom) = std::env::var(PYTHON_ENV) {
            if !custom.trim().is_empty() {
                return custom;
            }
        }

        ["python3", "/opt/homebrew/bin/python3", "/usr/local/bin/python3"]
            .into_iter()
            .find(|cmd| runs_ok(cmd, &["--version"]))
            .unwrap_or("python3")
            .to_string()
    }

    fn build_args(url: &str, config: &ExtractorConfig) -> Vec<String> {
        // web client unless told otherwise; only meaningful for YouTube
        let client = config
            .player_client
            .as_deref()
            .or_else(|| is_youtube_url(url).then_some("web"));

        let mut args = vec!["-m".to_string(), "yt_dlp".to_string()];
        args.extend(ytdlp_args(url, config, client));
        args
    }
}

impl Default for PythonInfoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InfoExtractor for PythonInfoExtractor {
    fn name(&self) -> &'static str {
        "python-yt-dlp"
    }

    fn is_available(&self) -> bool {
        runs_ok(&self.python_cmd, &["-c", "import yt_dlp"])
    }

    async fn extract(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<serde_json::Value, ExtractError> {
        let args = Self::build_args(url, config);
        tracing::debug!(
            extractor = self.name(),
            cmd = %format!("{} {}", self.python_cmd, args.join(" ")),
            "running yt-dlp module"
        );

        let output =
            run_output_with_timeout(&self.python_cmd, args, config.process_timeout_seconds).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if stderr.contains("No module named yt_dlp") {
                return Err(ExtractError::ToolNotFound(
                    "python yt_dlp module not installed".to_string(),
                ));
            }
            return Err(ExtractError::from(stderr));
        }

        tracing::info!(extractor = self.name(), "extraction succeeded");
        parse_dump(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_invocation() {
        let args = PythonInfoExtractor::build_args("https://youtu.be/x", &ExtractorConfig::default());
        assert_eq!(&args[..3], ["-m", "yt_dlp", "--dump-json"]);
        assert!(args.contains(&"youtube:player_client=web".to_string()));

        let args = PythonInfoExtractor::build_args(
            "https://soundcloud.com/a/b",
            &ExtractorConfig::default(),
        );
        assert!(!args.iter().any(|a| a.starts_with("youtube:")));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let extractor = PythonInfoExtractor::with_interpreter("/nonexistent/python3");
        assert!(!extractor.is_available());
        let err = extractor
            .extract("https://youtu.be/x", &ExtractorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ToolNotFound(_)));
    }
}
