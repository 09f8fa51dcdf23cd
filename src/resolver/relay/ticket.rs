// Relay tickets - the {upstream url, headers} pair carried in the query string
//
// Format: /proxy?u=<urlencoded upstream>&h=<urlencoded base64(JSON header map)>

use std::collections::BTreeMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

use super::RELAY_PATH;
use crate::resolver::errors::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTicket {
    pub upstream: String,
    pub headers: BTreeMap<String, String>,
}

impl RelayTicket {
    pub fn new(upstream: &str, headers: &BTreeMap<String, String>) -> Result<Self, ResolveError> {
        if upstream.trim().is_empty() {
            return Err(ResolveError::RelayEncoding(
                "upstream url is empty".to_string(),
            ));
        }

        Ok(Self {
            upstream: upstream.to_string(),
            headers: headers.clone(),
        })
    }

    /// Rebuild a ticket from an incoming query; a bad blob means no headers
    pub fn decode(upstream: String, blob: Option<&str>) -> Self {
        Self {
            upstream,
            headers: blob.map(decode_header_blob).unwrap_or_default(),
        }
    }

    pub fn to_url(&self, port: u16) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("u", &self.upstream)
            .append_pair("h", &encode_header_blob(&self.headers))
            .finish();

        format!("http://127.0.0.1:{}{}?{}", port, RELAY_PATH, query)
    }
}

/// Local relay URL for `upstream` on `port`
pub fn build_relay_url(
    port: u16,
    upstream: &str,
    headers: &BTreeMap<String, String>,
) -> Result<String, ResolveError> {
    Ok(RelayTicket::new(upstream, headers)?.to_url(port))
}

/// Best effort: an unserializable map becomes an empty blob
pub fn encode_header_blob(headers: &BTreeMap<String, String>) -> String {
    match serde_json::to_vec(headers) {
        Ok(json) => STANDARD.encode(json),
        Err(e) => {
            tracing::warn!(error = %e, "could not encode relay headers, sending none");
            String::new()
        }
    }
}

pub fn decode_header_blob(blob: &str) -> BTreeMap<String, String> {
    // A raw '+' that was not percent-encoded arrives as a space
    let blob = blob.trim().replace(' ', "+");
    if blob.is_empty() {
        return BTreeMap::new();
    }

    let bytes = STANDARD
        .decode(&blob)
        .or_else(|_| URL_SAFE_NO_PAD.decode(blob.trim_end_matches('=')));

    match bytes.map(|b| serde_json::from_slice::<BTreeMap<String, String>>(&b)) {
        Ok(Ok(headers)) => headers,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "relay header blob is not a JSON string map");
            BTreeMap::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "relay header blob is not base64");
            BTreeMap::new()
        }
    }
}
