// StreamResolver - page URL in, playable relay URL plus metadata out
//
// extract -> catalog -> constraints -> select -> project -> relay url

use std::sync::Arc;
use std::time::Duration;

use super::catalog::FormatCatalog;
use super::errors::{ExtractError, ResolveError};
use super::extractors::{audio_format_expression, ExtractorConfig, InfoExtractor};
use super::format_selector::FormatSelector;
use super::metadata::MetadataProjector;
use super::models::{ResolutionResult, ResolvedStream};
use super::relay::RelayServer;
use crate::config::{Config, SelectionConfig};

pub struct StreamResolver {
    extractor: Arc<dyn InfoExtractor>,
    relay: Arc<RelayServer>,
    extractor_config: ExtractorConfig,
    selection: SelectionConfig,
}

impl StreamResolver {
    pub fn new(extractor: Arc<dyn InfoExtractor>, relay: Arc<RelayServer>, config: &Config) -> Self {
        let mut extractor_config = config.extractor.clone();
        if extractor_config.format.is_none() {
            extractor_config.format = Some(audio_format_expression(
                &config.selection.preferred_containers,
            ));
        }

        Self {
            extractor,
            relay,
            extractor_config,
            selection: config.selection.clone(),
        }
    }

    pub fn relay(&self) -> &Arc<RelayServer> {
        &self.relay
    }

    /// Run the extractor on `url` and resolve its record
    pub async fn resolve(&self, url: &str) -> Result<ResolutionResult, ResolveError> {
        let limit = self.extractor_config.overall_timeout_seconds;
        tracing::info!(url, extractor = self.extractor.name(), "resolving");

        let raw = tokio::time::timeout(
            Duration::from_secs(limit),
            self.extractor.extract(url, &self.extractor_config),
        )
        .await
        .map_err(|_| ExtractError::Timeout(limit))??;

        self.resolve_record(&raw).await
    }

    /// Resolve an already extracted provider record
    pub async fn resolve_record(
        &self,
        raw: &serde_json::Value,
    ) -> Result<ResolutionResult, ResolveError> {
        let (catalog, stream) = self.select(raw)?;
        let metadata = MetadataProjector::project(catalog.record());

        let streaming_url = self.relay.relay_url(stream.url(), &stream.headers).await?;
        let result = ResolutionResult::new(streaming_url, &stream, metadata);

        tracing::info!(
            title = %result.title,
            ext = %result.ext,
            protocol = %result.protocol,
            "resolved"
        );
        Ok(result)
    }

    /// Selection only, no relay involved
    pub fn select(
        &self,
        raw: &serde_json::Value,
    ) -> Result<(FormatCatalog, ResolvedStream), ResolveError> {
        let catalog = FormatCatalog::load(raw)?;
        let constraints = self.selection.constraints_for(catalog.extractor_key());
        let stream = FormatSelector::select(&catalog, &constraints)?;
        Ok((catalog, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::config::RelayConfig;
    use crate::resolver::models::SelectionSource;

    struct StaticExtractor(serde_json::Value);

    #[async_trait]
    impl InfoExtractor for StaticExtractor {
        fn name(&self) -> &'static str {
            "static"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn extract(
            &self,
            _url: &str,
            config: &ExtractorConfig,
        ) -> Result<serde_json::Value, ExtractError> {
            assert!(config.format.as_deref().unwrap_or("").starts_with("bestaudio[ext=m4a]"));
            Ok(self.0.clone())
        }
    }

    struct SlowExtractor;

    #[async_trait]
    impl InfoExtractor for SlowExtractor {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn extract(
            &self,
            _url: &str,
            _config: &ExtractorConfig,
        ) -> Result<serde_json::Value, ExtractError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!({}))
        }
    }

    fn youtube_record() -> serde_json::Value {
        json!({
            "id": "abc",
            "title": "Night Drive",
            "uploader": "Synth Co",
            "extractor_key": "Youtube",
            "duration": 201.5,
            "thumbnails": [
                { "url": "https://i.ytimg.com/vi/abc/hq.jpg", "width": 480, "height": 360 },
                { "url": "https://i.ytimg.com/vi/abc/sq.jpg", "width": 544, "height": 544 }
            ],
            "http_headers": { "User-Agent": "yt-ua" },
            "formats": [
                { "format_id": "251", "url": "https://rr.googlevideo.com/251", "ext": "webm",
                  "acodec": "opus", "vcodec": "none", "protocol": "https", "abr": 160.0 },
                { "format_id": "140", "url": "https://rr.googlevideo.com/140", "ext": "m4a",
                  "acodec": "mp4a.40.2", "vcodec": "none", "protocol": "https", "abr": 129.5,
                  "http_headers": { "Referer": "https://www.youtube.com/" } },
                { "format_id": "18", "url": "https://rr.googlevideo.com/18", "ext": "mp4",
                  "acodec": "mp4a.40.2", "vcodec": "avc1.42001E", "protocol": "https" }
            ]
        })
    }

    fn resolver(extractor: Arc<dyn InfoExtractor>, config: &Config) -> StreamResolver {
        let relay = Arc::new(RelayServer::new(RelayConfig::default()).unwrap());
        StreamResolver::new(extractor, relay, config)
    }

    #[tokio::test]
    async fn test_resolve_end_to_end() {
        let config = Config::default();
        let resolver = resolver(Arc::new(StaticExtractor(youtube_record())), &config);

        let result = resolver.resolve("https://youtu.be/abc").await.unwrap();
        let port = resolver.relay().port().unwrap();
        assert!(result
            .streaming_url
            .starts_with(&format!("http://127.0.0.1:{}/proxy?u=", port)));
        assert_eq!(result.title, "Night Drive");
        assert_eq!(result.artist.as_deref(), Some("Synth Co"));
        assert_eq!(result.ext, "m4a");
        assert_eq!(result.mime_type.as_deref(), Some("audio/mp4"));
        assert_eq!(result.protocol, "https");
        assert_eq!(result.duration, Some(201.5));
        assert_eq!(result.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/abc/sq.jpg"));
        assert!(result.thumbnail_is_square);
    }

    #[tokio::test]
    async fn test_pinned_youtube_format_and_headers() {
        let config = Config::default();
        let resolver = resolver(Arc::new(StaticExtractor(youtube_record())), &config);

        let (_, stream) = resolver.select(&youtube_record()).unwrap();
        assert_eq!(stream.candidate.format_id.as_deref(), Some("140"));
        assert_eq!(stream.source, SelectionSource::PinnedFormat);
        assert_eq!(stream.headers["User-Agent"], "yt-ua");
        assert_eq!(stream.headers["Referer"], "https://www.youtube.com/");
    }

    #[tokio::test]
    async fn test_title_falls_back_to_url_stem() {
        let record = json!({
            "url": "https://cdn.example.com/media/summer-mix.mp3",
            "ext": "mp3",
            "acodec": "mp3",
            "vcodec": "none",
            "protocol": "https"
        });
        let config = Config::default();
        let resolver = resolver(Arc::new(StaticExtractor(record.clone())), &config);

        let result = resolver.resolve_record(&record).await.unwrap();
        assert_eq!(result.title, "summer-mix");
        assert_eq!(result.mime_type.as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn test_no_audio_stream_is_reported() {
        let record = json!({
            "title": "Video only",
            "formats": [
                { "url": "https://cdn/v.mp4", "ext": "mp4", "vcodec": "avc1", "acodec": "none" }
            ]
        });
        let config = Config::default();
        let resolver = resolver(Arc::new(StaticExtractor(record.clone())), &config);

        let err = resolver.resolve_record(&record).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoPlayableStream { candidates: 1 }));
        assert_eq!(resolver.relay().port(), None);
    }

    #[tokio::test]
    async fn test_overall_timeout() {
        let mut config = Config::default();
        config.extractor.overall_timeout_seconds = 1;
        let resolver = resolver(Arc::new(SlowExtractor), &config);

        let err = resolver.resolve("https://youtu.be/abc").await.unwrap_err();
        assert!(matches!(err, ResolveError::Extract(ExtractError::Timeout(1))));
    }
}
