// FormatCatalog - the ingestion boundary for provider records
//
// Turns the raw yt-dlp info dict into typed candidates once. Everything
// downstream (selector, projector) reads from the catalog only.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::errors::ResolveError;
use super::models::Candidate;
use super::record::{ProviderRecord, RawFormat};

/// Candidate streams of one provider record
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    record: ProviderRecord,
    candidates: Vec<Candidate>,
    top_level: Option<Candidate>,
    provider_headers: BTreeMap<String, String>,
}

impl FormatCatalog {
    /// Load a catalog from the raw info dict
    pub fn load(raw: &Value) -> Result<Self, ResolveError> {
        if !raw.is_object() {
            return Err(ResolveError::ProviderData(match raw {
                Value::Null => "extraction returned no record".to_string(),
                _ => "extraction record is not an object".to_string(),
            }));
        }

        let record = ProviderRecord::deserialize(raw)
            .map_err(|e| ResolveError::ProviderData(format!("malformed record: {}", e)))?;
        // yt-dlp copies the selected format's fields onto the record itself
        let selected = RawFormat::deserialize(raw)
            .map_err(|e| ResolveError::ProviderData(format!("malformed record: {}", e)))?;

        let provider_headers = selected.http_headers.clone();
        let top_level = selected
            .url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
            .then(|| Candidate::from_raw(selected));

        let candidates = record
            .formats
            .iter()
            .cloned()
            .map(Candidate::from_raw)
            .collect::<Vec<_>>();

        tracing::debug!(
            id = record.id.as_deref().unwrap_or("unknown"),
            extractor = record.extractor_key.as_deref().unwrap_or("unknown"),
            candidates = candidates.len(),
            has_top_level = top_level.is_some(),
            "loaded format catalog"
        );

        Ok(Self {
            record,
            candidates,
            top_level,
            provider_headers,
        })
    }

    /// Load from a saved `--dump-json` document
    pub fn from_json_str(json: &str) -> Result<Self, ResolveError> {
        let raw: Value = serde_json::from_str(json)?;
        Self::load(&raw)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// The provider's own pick, when the record carries a playable `url`
    pub fn top_level(&self) -> Option<&Candidate> {
        self.top_level.as_ref()
    }

    pub fn provider_headers(&self) -> &BTreeMap<String, String> {
        &self.provider_headers
    }

    pub fn extractor_key(&self) -> Option<&str> {
        self.record.extractor_key.as_deref()
    }

    pub fn record(&self) -> &ProviderRecord {
        &self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_record_is_rejected() {
        let err = FormatCatalog::load(&Value::Null).unwrap_err();
        assert!(matches!(err, ResolveError::ProviderData(_)));
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        let err = FormatCatalog::load(&json!(["not", "a", "record"])).unwrap_err();
        assert!(matches!(err, ResolveError::ProviderData(_)));
    }

    #[test]
    fn test_malformed_json_is_provider_data() {
        let err = FormatCatalog::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ResolveError::ProviderData(_)));
    }

    #[test]
    fn test_top_level_requires_url() {
        let catalog = FormatCatalog::load(&json!({
            "ext": "m4a",
            "acodec": "mp4a.40.2",
            "formats": [ { "format_id": "140", "url": "https://a/140", "ext": "m4a" } ],
        }))
        .unwrap();
        assert!(catalog.top_level().is_none());
        assert_eq!(catalog.candidates().len(), 1);
    }

    #[test]
    fn test_top_level_and_headers() {
        let catalog = FormatCatalog::load(&json!({
            "url": "https://a/140",
            "ext": "m4a",
            "acodec": "mp4a.40.2",
            "vcodec": "none",
            "protocol": "https",
            "extractor_key": "Youtube",
            "http_headers": { "User-Agent": "yt-dlp" },
        }))
        .unwrap();
        let top = catalog.top_level().unwrap();
        assert_eq!(top.container, "m4a");
        assert!(top.is_eligible());
        assert_eq!(catalog.extractor_key(), Some("Youtube"));
        assert_eq!(catalog.provider_headers()["User-Agent"], "yt-dlp");
    }
}
