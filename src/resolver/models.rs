// Common data models for stream resolution

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::RawFormat;

/// Transport protocol of a candidate stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Https,
    Http,
    /// m3u8 / m3u8_native
    Hls,
    /// http_dash_segments and friends
    DashSegments,
    /// Anything else yt-dlp reports (rtmp, f4m, ism, mhtml...), raw string kept
    Other(String),
}

impl Protocol {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "https" => Self::Https,
            "http" => Self::Http,
            "" => Self::Other(lower),
            p if p.starts_with("m3u8") || p == "hls" => Self::Hls,
            p if p.contains("dash") => Self::DashSegments,
            _ => Self::Other(lower),
        }
    }

    /// Plain single-request HTTP(S)
    pub fn is_progressive(&self) -> bool {
        matches!(self, Self::Https | Self::Http)
    }

    /// Lower is better; segmented transports sort last
    pub fn rank(&self) -> u8 {
        match self {
            Self::Https | Self::Http => 0,
            Self::Other(_) => 2,
            Self::Hls => 3,
            Self::DashSegments => 4,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
            Self::Hls => "m3u8_native",
            Self::DashSegments => "http_dash_segments",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One encoded stream option reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub url: Option<String>,
    /// Lowercased extension, e.g. "m4a"
    pub container: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub protocol: Protocol,
    /// kbps, 0 when unknown
    pub average_bitrate: f64,
    /// bytes, 0 when unknown
    pub file_size: u64,
    pub format_id: Option<String>,
    pub http_headers: BTreeMap<String, String>,
    pub is_fragmented: bool,
    pub is_dash: bool,
    pub manifest_url: Option<String>,
    pub mime_type: Option<String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    codec
        .as_deref()
        .map(str::trim)
        .map_or(false, |c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
}

impl Candidate {
    pub fn from_raw(raw: RawFormat) -> Self {
        let protocol = raw
            .protocol
            .as_deref()
            .map(Protocol::parse)
            .unwrap_or(Protocol::Other(String::new()));

        let mime_type = raw.mime_type.clone().or_else(|| {
            raw.http_headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .map(|(_, v)| v.clone())
        });

        Self {
            url: raw.url.filter(|u| !u.trim().is_empty()),
            container: raw.ext.unwrap_or_default().trim().to_ascii_lowercase(),
            video_codec: raw.vcodec,
            audio_codec: raw.acodec,
            is_dash: matches!(protocol, Protocol::DashSegments),
            protocol,
            average_bitrate: raw.abr.or(raw.tbr).unwrap_or(0.0),
            file_size: raw.filesize.or(raw.filesize_approx).unwrap_or(0),
            format_id: raw.format_id,
            http_headers: raw.http_headers,
            is_fragmented: raw.fragments || raw.fragment_base_url.is_some(),
            manifest_url: raw.manifest_url,
            mime_type,
        }
    }

    pub fn has_audio(&self) -> bool {
        codec_present(&self.audio_codec)
    }

    pub fn has_video(&self) -> bool {
        codec_present(&self.video_codec)
    }

    /// Progressive, single-file, audio-only, directly fetchable
    pub fn is_eligible(&self) -> bool {
        self.has_audio()
            && !self.has_video()
            && self.url.is_some()
            && self.protocol.is_progressive()
            && !self.is_fragmented
            && !self.is_dash
            && self.manifest_url.is_none()
            && !self.container.contains("dash")
    }
}

/// What the selector is allowed to pick
#[derive(Debug, Clone, Default)]
pub struct SelectionConstraints {
    /// Most preferred first
    pub preferred_containers: Vec<String>,
    /// Pins a known-good variant when present among eligible candidates
    pub preferred_format_id: Option<String>,
    /// Used as the top-level pick when the catalog exposes none
    pub fallback: Option<Candidate>,
}

impl SelectionConstraints {
    pub fn new<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred_containers: containers
                .into_iter()
                .map(|c| c.into().to_ascii_lowercase())
                .collect(),
            preferred_format_id: None,
            fallback: None,
        }
    }

    /// Container order used for in-app streaming
    pub fn streaming() -> Self {
        Self::new(["m4a", "mp3", "webm", "opus", "aac", "ogg"])
    }

    /// Audio download: m4a first, anything audio-only after
    pub fn audio_download() -> Self {
        Self::new(["m4a"])
    }

    pub fn with_preferred_format_id(mut self, id: Option<String>) -> Self {
        self.preferred_format_id = id;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<Candidate>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Index in the preferred list, list length when absent
    pub fn container_rank(&self, container: &str) -> usize {
        self.preferred_containers
            .iter()
            .position(|c| c == container)
            .unwrap_or(self.preferred_containers.len())
    }

    pub fn accepts_container(&self, container: &str) -> bool {
        self.preferred_containers.iter().any(|c| c == container)
    }
}

/// How the selector arrived at its pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    PinnedFormat,
    TopLevel,
    Ranked,
}

/// The selected stream, ready to be relayed
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    pub candidate: Candidate,
    pub mime_type: Option<String>,
    /// Provider top-level headers overlaid with the candidate's own
    pub headers: BTreeMap<String, String>,
    pub source: SelectionSource,
}

impl ResolvedStream {
    pub fn url(&self) -> &str {
        self.candidate.url.as_deref().unwrap_or_default()
    }

    /// Last path segment of the stream URL without its extension
    pub fn filename_stem(&self) -> Option<String> {
        let parsed = url::Url::parse(self.url()).ok()?;
        let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
        let stem = match segment.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => segment,
        };
        Some(stem.to_string())
    }
}

/// Display metadata derived from the provider record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_width: Option<u64>,
    pub thumbnail_height: Option<u64>,
    pub thumbnail_is_square: bool,
    pub duration_seconds: Option<f64>,
}

/// Document returned to the playback client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Relay URL, not the upstream one
    pub streaming_url: String,
    pub title: String,
    pub artist: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_width: Option<u64>,
    pub thumbnail_height: Option<u64>,
    pub thumbnail_is_square: bool,
    pub duration: Option<f64>,
    pub ext: String,
    pub acodec: Option<String>,
    pub mime_type: Option<String>,
    pub protocol: String,
}

impl ResolutionResult {
    pub const UNKNOWN_TITLE: &'static str = "Unknown Title";

    pub fn new(streaming_url: String, stream: &ResolvedStream, metadata: TrackMetadata) -> Self {
        let title = metadata
            .title
            .or_else(|| stream.filename_stem())
            .unwrap_or_else(|| Self::UNKNOWN_TITLE.to_string());

        Self {
            streaming_url,
            title,
            artist: metadata.artist,
            thumbnail_url: metadata.thumbnail_url,
            thumbnail_width: metadata.thumbnail_width,
            thumbnail_height: metadata.thumbnail_height,
            thumbnail_is_square: metadata.thumbnail_is_square,
            duration: metadata.duration_seconds,
            ext: stream.candidate.container.clone(),
            acodec: stream.candidate.audio_codec.clone(),
            mime_type: stream.mime_type.clone(),
            protocol: stream.candidate.protocol.to_string(),
        }
    }
}
