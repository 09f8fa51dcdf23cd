// Extraction diagnostics - classifies yt-dlp failures
//
// Reads the stderr text of a failed extraction and decides:
// - Why the provider refused the request (403, rate limit, DRM, ...)
// - Whether retrying with the other extractor mode is worthwhile

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reasons an extraction can be refused upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden
    Http403Forbidden,

    /// 429 or an explicit rate-limit message
    RateLimited,

    /// Bot detection / captcha wall
    BotDetection,

    /// Proof of Origin token demanded by the player
    PoTokenRequired,

    /// Age gate requiring a signed-in account
    AgeRestricted,

    /// Not available in the current region
    GeoBlocked,

    /// Private item
    PrivateItem,

    /// Removed, deleted or never existed (404/410)
    Unavailable,

    /// DRM-protected; no progressive stream will ever exist
    DrmProtected,

    /// Socket timeout or refused connection
    NetworkTimeout,

    /// Anything else yt-dlp complained about
    Unknown,
}

impl BlockingReason {
    /// Whether running the other extractor mode might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http403Forbidden
                | Self::RateLimited
                | Self::BotDetection
                | Self::PoTokenRequired
                | Self::NetworkTimeout
                | Self::Unknown
        )
    }

    /// Permanent restrictions, no workaround exists
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DrmProtected | Self::Unavailable | Self::PrivateItem)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "access denied (HTTP 403)",
            Self::RateLimited => "rate limited by provider",
            Self::BotDetection => "bot detection triggered",
            Self::PoTokenRequired => "proof of origin token required",
            Self::AgeRestricted => "age-restricted content",
            Self::GeoBlocked => "not available in this region",
            Self::PrivateItem => "private item",
            Self::Unavailable => "item unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::NetworkTimeout => "network timeout",
            Self::Unknown => "unknown extraction failure",
        }
    }
}

lazy_static::lazy_static! {
    static ref HTTP_ERROR_RE: Regex =
        Regex::new(r"(?i)HTTP Error (\d{3})").expect("static regex");
}

/// Extract the HTTP status yt-dlp reported, if any
pub fn http_status(error: &str) -> Option<u16> {
    HTTP_ERROR_RE
        .captures(error)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Analyze an error message and return the blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    if error.trim().is_empty() {
        return None;
    }

    // An explicit HTTP status is the most reliable signal
    match http_status(error) {
        Some(403) => return Some(BlockingReason::Http403Forbidden),
        Some(429) => return Some(BlockingReason::RateLimited),
        Some(404) | Some(410) => return Some(BlockingReason::Unavailable),
        _ => {}
    }

    let lower = error.to_lowercase();

    if lower.contains("drm")
        || lower.contains("widevine")
        || lower.contains("playready")
        || lower.contains("fairplay")
        || lower.contains("requires purchase")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("po token") || lower.contains("proof of origin") {
        return Some(BlockingReason::PoTokenRequired);
    }

    if lower.contains("age-restricted") || lower.contains("confirm your age") {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video") || lower.contains("is private") {
        return Some(BlockingReason::PrivateItem);
    }

    if lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("no longer available")
    {
        return Some(BlockingReason::Unavailable);
    }

    if lower.contains("not available in your country") || lower.contains("geo restrict") {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot") || lower.contains("captcha") || lower.contains("unusual traffic") {
        return Some(BlockingReason::BotDetection);
    }

    if lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    Some(BlockingReason::Unknown)
}
