// Typed view of the yt-dlp info dict
//
// yt-dlp emits loosely typed JSON: numbers may be ints or floats, optional
// fields may be null, strings or missing. Every field is decoded leniently
// here, once, so the rest of the crate works with plain Rust types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One entry of `formats`, also used for the top-level selected format
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFormat {
    #[serde(default, deserialize_with = "lenient::string")]
    pub format_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub vcodec: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub acodec: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub abr: Option<f64>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub tbr: Option<f64>,
    #[serde(default, deserialize_with = "lenient::unsigned")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient::unsigned")]
    pub filesize_approx: Option<u64>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub http_headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient::non_empty_array")]
    pub fragments: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub fragment_base_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub manifest_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThumbnail {
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::unsigned")]
    pub width: Option<u64>,
    #[serde(default, deserialize_with = "lenient::unsigned")]
    pub height: Option<u64>,
}

/// Top-level fields of the info dict that are not format attributes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub extractor_key: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub uploader: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub channel: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub thumbnails: Vec<RawThumbnail>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient::float")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub formats: Vec<RawFormat>,
}

mod lenient {
    use super::*;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
            _ => None,
        })
    }

    pub fn unsigned<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(float(d)?.filter(|f| *f >= 0.0).map(|f| f as u64))
    }

    pub fn string_map<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| match v {
                    Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect(),
            _ => BTreeMap::new(),
        })
    }

    pub fn non_empty_array<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(matches!(Value::deserialize(d)?, Value::Array(items) if !items.is_empty()))
    }

    /// Lists must be arrays (or null); entries that don't decode are dropped
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        match Value::deserialize(d)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            other => Err(serde::de::Error::custom(format!(
                "expected a list, found {}",
                kind(&other)
            ))),
        }
    }

    fn kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }
}
