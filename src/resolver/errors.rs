// Error types for stream resolution

use thiserror::Error;

use super::extractors::{diagnose_error, BlockingReason};

/// Failures of the extraction provider (yt-dlp)
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// yt-dlp binary or python module not found
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Extraction did not finish in time
    #[error("extraction timed out after {0}s")]
    Timeout(u64),

    /// The provider refused the request
    #[error("{}: {message}", .reason.description())]
    Blocked {
        reason: BlockingReason,
        message: String,
    },

    /// yt-dlp produced output we could not read
    #[error("parse error: {0}")]
    Parse(String),

    /// Process could not be spawned or waited on
    #[error("execution error: {0}")]
    Execution(String),
}

impl ExtractError {
    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        match self {
            Self::Blocked { reason, .. } => Some(*reason),
            Self::Timeout(_) => Some(BlockingReason::NetworkTimeout),
            _ => None,
        }
    }

    /// Whether the other extractor mode is worth a try
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blocked { reason, .. } => reason.is_retryable(),
            Self::ToolNotFound(_) | Self::Timeout(_) | Self::Execution(_) | Self::Parse(_) => true,
        }
    }
}

// stderr from yt-dlp is classified through the blocking diagnostics
impl From<String> for ExtractError {
    fn from(stderr: String) -> Self {
        let message = stderr.trim().to_string();

        if message.contains("command not found") || message.contains("No such file") {
            return Self::ToolNotFound(message);
        }

        match diagnose_error(&message) {
            Some(reason) => Self::Blocked { reason, message },
            None => Self::Execution("extractor exited without a message".to_string()),
        }
    }
}

/// Errors surfaced by the resolution core
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Extraction record absent or malformed
    #[error("provider data error: {0}")]
    ProviderData(String),

    /// Nothing survived the eligibility filter
    #[error("no playable audio stream among {candidates} candidate(s)")]
    NoPlayableStream { candidates: usize },

    /// Relay URL could not be built
    #[error("relay encoding error: {0}")]
    RelayEncoding(String),

    /// Relay could not reach the upstream
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// Relay failed to bind, or its accept loop has stopped
    #[error("relay unavailable: {0}")]
    RelayUnavailable(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl From<serde_json::Error> for ResolveError {
    fn from(e: serde_json::Error) -> Self {
        Self::ProviderData(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_is_classified() {
        let err = ExtractError::from("ERROR: HTTP Error 403: Forbidden\n".to_string());
        assert_eq!(err.blocking_reason(), Some(BlockingReason::Http403Forbidden));
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("access denied"));
    }

    #[test]
    fn test_missing_binary() {
        let err = ExtractError::from("sh: yt-dlp: command not found".to_string());
        assert!(matches!(err, ExtractError::ToolNotFound(_)));
    }

    #[test]
    fn test_drm_is_not_retryable() {
        let err = ExtractError::from("This video is DRM protected".to_string());
        assert!(!err.is_retryable());
    }
}
