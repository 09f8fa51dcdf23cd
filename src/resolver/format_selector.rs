// FormatSelector - picks the single audio stream to relay
//
// Order of decisions:
// - Eligibility filter (progressive, single-file, audio-only, fetchable)
// - Pinned format id (known-good variant for a provider)
// - Provider's own top-level pick, when compatible
// - Ranking: container preference > transport > bitrate > file size
//
// Pure and deterministic: same catalog + constraints, same answer.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::catalog::FormatCatalog;
use super::errors::ResolveError;
use super::models::{Candidate, ResolvedStream, SelectionConstraints, SelectionSource};

/// Container to MIME type, used when the provider supplied none
const CONTAINER_MIME: &[(&str, &str)] = &[
    ("m4a", "audio/mp4"),
    ("mp4", "audio/mp4"),
    ("mp3", "audio/mpeg"),
    ("webm", "audio/webm"),
    ("opus", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("aac", "audio/aac"),
    ("wav", "audio/wav"),
];

pub fn mime_for_container(container: &str) -> Option<&'static str> {
    CONTAINER_MIME
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(container))
        .map(|(_, mime)| *mime)
}

pub struct FormatSelector;

impl FormatSelector {
    /// Select the best compatible audio-only stream
    pub fn select(
        catalog: &FormatCatalog,
        constraints: &SelectionConstraints,
    ) -> Result<ResolvedStream, ResolveError> {
        let top_level = catalog.top_level().or(constraints.fallback.as_ref());
        let pool = Self::eligible_pool(catalog.candidates());

        let pinned = constraints.preferred_format_id.as_deref().and_then(|id| {
            pool.iter()
                .copied()
                .find(|c| c.format_id.as_deref() == Some(id))
        });

        let shortcut = top_level
            .filter(|t| t.is_eligible() && constraints.accepts_container(&t.container));

        let (chosen, source) = if let Some(c) = pinned {
            (Some(c), SelectionSource::PinnedFormat)
        } else if let Some(top) = shortcut {
            (Some(top), SelectionSource::TopLevel)
        } else {
            (Self::rank(&pool, constraints), SelectionSource::Ranked)
        };

        // Container and protocol are re-checked separately, in this order
        let (chosen, source) = Self::recheck_top_level(chosen, source, &pool, constraints, |c| {
            constraints.accepts_container(&c.container)
        });
        let (chosen, source) = Self::recheck_top_level(chosen, source, &pool, constraints, |c| {
            c.protocol.is_progressive()
        });

        let Some(candidate) = chosen else {
            let total = catalog.candidates().len() + usize::from(top_level.is_some());
            tracing::warn!(candidates = total, "no eligible audio-only stream");
            return Err(ResolveError::NoPlayableStream { candidates: total });
        };

        let mime_type = candidate
            .mime_type
            .clone()
            .or_else(|| mime_for_container(&candidate.container).map(str::to_string));

        let mut headers: BTreeMap<String, String> = catalog.provider_headers().clone();
        headers.extend(
            candidate
                .http_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        tracing::info!(
            format_id = candidate.format_id.as_deref().unwrap_or("-"),
            ext = %candidate.container,
            acodec = candidate.audio_codec.as_deref().unwrap_or("-"),
            protocol = %candidate.protocol,
            abr = candidate.average_bitrate,
            source = ?source,
            eligible = pool.len(),
            "selected audio stream"
        );

        Ok(ResolvedStream {
            candidate: candidate.clone(),
            mime_type,
            headers,
            source,
        })
    }

    /// Eligible listed formats in provider order. The top-level pick only
    /// ever competes through the shortcut, never in ranking.
    fn eligible_pool(candidates: &[Candidate]) -> Vec<&Candidate> {
        candidates.iter().filter(|c| c.is_eligible()).collect()
    }

    /// Best ranked candidate; ties keep provider order
    fn rank<'a>(pool: &[&'a Candidate], constraints: &SelectionConstraints) -> Option<&'a Candidate> {
        pool.iter()
            .copied()
            .min_by(|a, b| Self::compare(a, b, constraints))
    }

    fn compare(a: &Candidate, b: &Candidate, constraints: &SelectionConstraints) -> Ordering {
        constraints
            .container_rank(&a.container)
            .cmp(&constraints.container_rank(&b.container))
            .then_with(|| a.protocol.rank().cmp(&b.protocol.rank()))
            .then_with(|| b.average_bitrate.total_cmp(&a.average_bitrate))
            .then_with(|| b.file_size.cmp(&a.file_size))
    }

    /// Drops a top-level shortcut that fails `accepts` and re-ranks the pool
    fn recheck_top_level<'a, F>(
        chosen: Option<&'a Candidate>,
        source: SelectionSource,
        pool: &[&'a Candidate],
        constraints: &SelectionConstraints,
        accepts: F,
    ) -> (Option<&'a Candidate>, SelectionSource)
    where
        F: Fn(&Candidate) -> bool,
    {
        match chosen {
            Some(c) if source == SelectionSource::TopLevel && !accepts(c) => {
                tracing::debug!(ext = %c.container, protocol = %c.protocol, "discarding top-level pick");
                (Self::rank(pool, constraints), SelectionSource::Ranked)
            }
            _ => (chosen, source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn audio(id: &str, ext: &str, abr: f64) -> Value {
        json!({
            "format_id": id,
            "url": format!("https://cdn.example.com/{}.{}", id, ext),
            "ext": ext,
            "vcodec": "none",
            "acodec": if ext == "m4a" { "mp4a.40.2" } else { "opus" },
            "protocol": "https",
            "abr": abr,
        })
    }

    fn catalog(formats: Vec<Value>) -> FormatCatalog {
        FormatCatalog::load(&json!({ "formats": formats })).unwrap()
    }

    fn aac_only() -> SelectionConstraints {
        SelectionConstraints::new(["m4a", "aac"])
    }

    #[test]
    fn test_container_preference_beats_bitrate() {
        let cat = catalog(vec![audio("251", "webm", 160.0), audio("140", "m4a", 128.0)]);
        let stream = FormatSelector::select(&cat, &SelectionConstraints::streaming()).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
        assert_eq!(stream.source, SelectionSource::Ranked);
        assert_eq!(stream.mime_type.as_deref(), Some("audio/mp4"));
    }

    #[test]
    fn test_bitrate_then_file_size_break_ties() {
        let mut small = audio("a", "m4a", 128.0);
        small["filesize"] = json!(1_000);
        let mut large = audio("b", "m4a", 128.0);
        large["filesize"] = json!(2_000);
        let cat = catalog(vec![audio("c", "m4a", 48.0), small, large]);

        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_never_selects_video() {
        let muxed = json!({
            "format_id": "18",
            "url": "https://cdn.example.com/18.mp4",
            "ext": "m4a",
            "vcodec": "avc1.42001E",
            "acodec": "mp4a.40.2",
            "protocol": "https",
            "abr": 320.0,
        });
        let cat = catalog(vec![muxed, audio("251", "webm", 64.0)]);
        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("251"));
        assert!(!stream.candidate.has_video());
    }

    #[test]
    fn test_empty_or_ineligible_fails() {
        let err = FormatSelector::select(&catalog(vec![]), &aac_only()).unwrap_err();
        assert!(matches!(err, ResolveError::NoPlayableStream { candidates: 0 }));

        let mut hls = audio("hls", "m4a", 128.0);
        hls["protocol"] = json!("m3u8_native");
        let mut fragmented = audio("frag", "m4a", 128.0);
        fragmented["fragments"] = json!([{ "path": "seg1" }]);
        let mut manifest = audio("mpd", "m4a", 128.0);
        manifest["manifest_url"] = json!("https://cdn.example.com/manifest.mpd");
        let mut no_url = audio("nourl", "m4a", 128.0);
        no_url["url"] = Value::Null;

        let cat = catalog(vec![hls, fragmented, manifest, no_url]);
        let err = FormatSelector::select(&cat, &aac_only()).unwrap_err();
        assert!(matches!(err, ResolveError::NoPlayableStream { candidates: 4 }));
    }

    #[test]
    fn test_dash_container_is_ineligible() {
        let mut dash = audio("d", "m4a_dash", 256.0);
        dash["ext"] = json!("m4a_dash");
        let cat = catalog(vec![dash, audio("140", "m4a", 128.0)]);
        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let cat = catalog(vec![
            audio("1", "m4a", 128.0),
            audio("2", "m4a", 128.0),
            audio("3", "webm", 160.0),
        ]);
        let constraints = SelectionConstraints::streaming();
        let first = FormatSelector::select(&cat, &constraints).unwrap();
        let second = FormatSelector::select(&cat, &constraints).unwrap();
        assert_eq!(first.candidate, second.candidate);
        // equal rank keeps provider order
        assert_eq!(first.candidate.format_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_compatible_top_level_is_used_directly() {
        let mut raw = audio("140", "m4a", 128.0);
        raw["formats"] = json!([audio("141", "m4a", 256.0)]);
        let cat = FormatCatalog::load(&raw).unwrap();

        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.source, SelectionSource::TopLevel);
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_incompatible_top_level_is_discarded() {
        let mut raw = audio("251", "webm", 160.0);
        raw["formats"] = json!([audio("251", "webm", 160.0), audio("140", "m4a", 128.0)]);
        let cat = FormatCatalog::load(&raw).unwrap();

        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.source, SelectionSource::Ranked);
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_discarded_top_level_does_not_win_ranking() {
        // top-level outbids every listed format but its container is not preferred
        let mut raw = audio("top", "webm", 300.0);
        raw["url"] = json!("https://cdn.example.com/unlisted/top.webm");
        raw["formats"] = json!([audio("251", "webm", 160.0)]);
        let cat = FormatCatalog::load(&raw).unwrap();

        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.source, SelectionSource::Ranked);
        assert_eq!(stream.candidate.format_id.as_deref(), Some("251"));
    }

    #[test]
    fn test_unpreferred_top_level_alone_is_not_playable() {
        let cat = FormatCatalog::load(&audio("top", "webm", 300.0)).unwrap();
        assert!(matches!(
            FormatSelector::select(&cat, &aac_only()),
            Err(ResolveError::NoPlayableStream { candidates: 1 })
        ));
    }

    #[test]
    fn test_download_preset_only_takes_m4a_shortcut() {
        let mut raw = audio("251", "webm", 160.0);
        raw["formats"] = json!([audio("251", "webm", 160.0), audio("140", "m4a", 128.0)]);
        let cat = FormatCatalog::load(&raw).unwrap();

        let streaming = FormatSelector::select(&cat, &SelectionConstraints::streaming()).unwrap();
        assert_eq!(streaming.source, SelectionSource::TopLevel);
        assert_eq!(streaming.candidate.format_id.as_deref(), Some("251"));

        let download = FormatSelector::select(&cat, &SelectionConstraints::audio_download()).unwrap();
        assert_eq!(download.source, SelectionSource::Ranked);
        assert_eq!(download.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_fallback_candidate_acts_as_top_level() {
        let fallback = FormatCatalog::load(&audio("140", "m4a", 128.0))
            .unwrap()
            .top_level()
            .cloned();
        let cat = catalog(vec![audio("139", "m4a", 48.0)]);
        let constraints = aac_only().with_fallback(fallback);

        let stream = FormatSelector::select(&cat, &constraints).unwrap();
        assert_eq!(stream.source, SelectionSource::TopLevel);
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_pinned_format_wins_over_ranking_and_top_level() {
        let mut raw = audio("141", "m4a", 256.0);
        raw["formats"] = json!([audio("141", "m4a", 256.0), audio("140", "m4a", 128.0)]);
        let cat = FormatCatalog::load(&raw).unwrap();
        let constraints = aac_only().with_preferred_format_id(Some("140".to_string()));

        let stream = FormatSelector::select(&cat, &constraints).unwrap();
        assert_eq!(stream.source, SelectionSource::PinnedFormat);
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
    }

    #[test]
    fn test_pinned_format_must_be_eligible() {
        let mut video = audio("140", "m4a", 128.0);
        video["vcodec"] = json!("avc1");
        let cat = catalog(vec![video, audio("139", "m4a", 48.0)]);
        let constraints = aac_only().with_preferred_format_id(Some("140".to_string()));

        let stream = FormatSelector::select(&cat, &constraints).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("139"));
    }

    #[test]
    fn test_headers_merge_candidate_over_provider() {
        let mut raw = json!({ "http_headers": { "User-Agent": "top", "Referer": "https://site/" } });
        let mut fmt = audio("140", "m4a", 128.0);
        fmt["http_headers"] = json!({ "User-Agent": "fmt", "Cookie": "a=b" });
        raw["formats"] = json!([fmt]);
        let cat = FormatCatalog::load(&raw).unwrap();

        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.headers["User-Agent"], "fmt");
        assert_eq!(stream.headers["Referer"], "https://site/");
        assert_eq!(stream.headers["Cookie"], "a=b");
    }

    #[test]
    fn test_unknown_container_leaves_mime_unset() {
        let cat = catalog(vec![audio("x", "flac", 900.0)]);
        let stream = FormatSelector::select(&cat, &aac_only()).unwrap();
        assert_eq!(stream.mime_type, None);
        assert_eq!(mime_for_container("MP3"), Some("audio/mpeg"));
    }
}
