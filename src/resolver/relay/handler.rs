// Relay request handling
//
// GET/HEAD /proxy?u=..&h=.. is fetched upstream with the ticket's headers and
// streamed back. Status is mirrored; only allow-listed headers come back.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::{ReaderStream, StreamReader};

use super::ticket::RelayTicket;
use super::{ALLOWED_RESPONSE_HEADERS, RELAY_PATH};
use crate::resolver::errors::ResolveError;

/// Shared, immutable per-server state
#[derive(Clone)]
pub struct RelayState {
    client: reqwest::Client,
    chunk_size: usize,
    user_agent: Arc<str>,
}

impl RelayState {
    pub fn new(client: reqwest::Client, chunk_size: usize, user_agent: &str) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
            user_agent: Arc::from(user_agent),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    pub u: Option<String>,
    pub h: Option<String>,
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        // HEAD is routed to the GET handler
        .route(RELAY_PATH, get(relay))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

async fn relay(
    State(state): State<RelayState>,
    method: Method,
    Query(query): Query<RelayQuery>,
    client_headers: HeaderMap,
) -> Response {
    let head = method == Method::HEAD;

    let Some(upstream) = query.u.filter(|u| !u.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing upstream url").into_response();
    };

    let ticket = RelayTicket::decode(upstream, query.h.as_deref());
    let target = match url::Url::parse(&ticket.upstream) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => {
            tracing::debug!(upstream = %ticket.upstream, "rejecting non-http upstream");
            return (StatusCode::BAD_REQUEST, "invalid upstream url").into_response();
        }
    };
    let outbound = merge_headers(&ticket.headers, &client_headers, &state.user_agent);

    tracing::debug!(
        %method,
        host = target.host_str().unwrap_or("-"),
        range = outbound.get(header::RANGE).and_then(|v| v.to_str().ok()).unwrap_or("-"),
        "relaying request"
    );

    let request = if head {
        state.client.head(target)
    } else {
        state.client.get(target)
    };

    match request.headers(outbound).send().await {
        Ok(upstream) => relay_response(upstream, head, state.chunk_size),
        Err(e) => {
            let err = ResolveError::UpstreamFetch(e.to_string());
            tracing::warn!(error = %err, "upstream fetch failed");
            let body = if head {
                Body::empty()
            } else {
                Body::from(err.to_string())
            };
            (StatusCode::BAD_GATEWAY, body).into_response()
        }
    }
}

/// Ticket headers, then client Range/Accept, then a User-Agent if none is set
pub fn merge_headers(
    ticket_headers: &BTreeMap<String, String>,
    client_headers: &HeaderMap,
    default_user_agent: &str,
) -> HeaderMap {
    let mut outbound = HeaderMap::new();

    for (name, value) in ticket_headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            tracing::debug!(header = %name, "dropping invalid relay header");
            continue;
        };
        if is_hop_by_hop(&name) {
            continue;
        }
        outbound.insert(name, value);
    }

    for name in [header::RANGE, header::ACCEPT] {
        if let Some(value) = client_headers.get(&name) {
            outbound.insert(name, value.clone());
        }
    }

    if !outbound.contains_key(header::USER_AGENT) {
        let fallback = client_headers
            .get(header::USER_AGENT)
            .cloned()
            .or_else(|| HeaderValue::from_str(default_user_agent).ok());
        if let Some(ua) = fallback {
            outbound.insert(header::USER_AGENT, ua);
        }
    }

    outbound
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    [
        header::HOST,
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
    ]
    .contains(name)
}

fn relay_response(upstream: reqwest::Response, head: bool, chunk_size: usize) -> Response {
    let status = upstream.status();
    let mut headers = HeaderMap::new();
    for name in ALLOWED_RESPONSE_HEADERS {
        if let Some(value) = upstream.headers().get(&name) {
            headers.insert(name, value.clone());
        }
    }

    tracing::info!(status = status.as_u16(), head, "relayed upstream response");

    let body = if head {
        Body::empty()
    } else {
        // Dropping the body (client gone) drops the upstream response with it
        let reader = StreamReader::new(upstream.bytes_stream().map_err(std::io::Error::other));
        Body::from_stream(ReaderStream::with_capacity(reader, chunk_size))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
