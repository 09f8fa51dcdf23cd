// Local HTTP relay for upstream media URLs
//
// Players cannot attach provider-specific headers to a plain URL, so streams
// are played through http://127.0.0.1:<port>/proxy which adds them upstream.

mod handler;
mod server;
pub mod ticket;

use axum::http::{header, HeaderName};

pub use handler::{merge_headers, router, RelayQuery, RelayState};
pub use server::RelayServer;
pub use ticket::{build_relay_url, RelayTicket};

pub const RELAY_PATH: &str = "/proxy";

/// Upstream response headers passed back to the client
pub const ALLOWED_RESPONSE_HEADERS: [HeaderName; 9] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::ACCEPT_RANGES,
    header::CONTENT_RANGE,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
    header::DATE,
    header::SERVER,
];
