// InfoExtractor layer - runs yt-dlp and returns its raw JSON record
//
// Two modes:
// - Python: `python3 -m yt_dlp` (better for YouTube, avoids bot detection)
// - CLI: native `yt-dlp` binary (faster, no Python dependency)
//
// The orchestrator picks the mode per URL and falls back to the other one.

mod cli;
mod diagnostics;
mod orchestrator;
mod python;
mod traits;

pub use cli::CliInfoExtractor;
pub use diagnostics::{diagnose_error, http_status, BlockingReason};
pub use orchestrator::InfoExtractorOrchestrator;
pub use python::{PythonInfoExtractor, PYTHON_ENV};
pub use traits::{
    audio_format_expression, is_youtube_url, ExtractorConfig, ExtractorMode, InfoExtractor,
};
