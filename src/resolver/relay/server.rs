// RelayServer - owns the loopback listener and hands out relay URLs
//
// Started lazily on the first relay_url() call. Concurrent first calls share
// one bind; later calls reuse the recorded port.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::OnceCell;

use super::handler::{router, RelayState};
use super::ticket::build_relay_url;
use crate::config::RelayConfig;
use crate::resolver::errors::ResolveError;

#[derive(Debug, Clone, Copy)]
struct RelaySession {
    port: u16,
}

pub struct RelayServer {
    config: RelayConfig,
    client: reqwest::Client,
    session: OnceCell<RelaySession>,
    crashed: Arc<AtomicBool>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Result<Self, ResolveError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout());

        // Only the configured proxy is used, never one from the environment
        builder = match config.proxy.as_deref() {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                    ResolveError::RelayUnavailable(format!(
                        "invalid relay proxy {}: {}",
                        proxy_url, e
                    ))
                })?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| ResolveError::RelayUnavailable(format!("http client: {}", e)))?;

        Ok(Self {
            config,
            client,
            session: OnceCell::new(),
            crashed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Port of the running relay, if it was started
    pub fn port(&self) -> Option<u16> {
        self.session.get().map(|s| s.port)
    }

    /// Bind and spawn the relay once; returns its port
    pub async fn ensure_started(&self) -> Result<u16, ResolveError> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(ResolveError::RelayUnavailable(
                "relay accept loop has stopped".to_string(),
            ));
        }

        let session = self.session.get_or_try_init(|| self.start()).await?;
        Ok(session.port)
    }

    /// Relay URL for `upstream`, starting the relay if needed
    pub async fn relay_url(
        &self,
        upstream: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, ResolveError> {
        if upstream.trim().is_empty() {
            return Err(ResolveError::RelayEncoding(
                "upstream url is empty".to_string(),
            ));
        }

        let port = self.ensure_started().await?;
        build_relay_url(port, upstream, headers)
    }

    async fn start(&self) -> Result<RelaySession, ResolveError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ResolveError::RelayUnavailable(format!("bind {}: {}", addr, e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| ResolveError::RelayUnavailable(e.to_string()))?
            .port();

        let app = router(RelayState::new(
            self.client.clone(),
            self.config.chunk_size,
            &self.config.user_agent,
        ));

        let crashed = self.crashed.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, app).await;
            crashed.store(true, Ordering::SeqCst);
            match result {
                Ok(()) => tracing::error!(port, "relay accept loop exited"),
                Err(e) => tracing::error!(port, error = %e, "relay accept loop failed"),
            }
        });

        tracing::info!(port, "relay listening on 127.0.0.1");
        Ok(RelaySession { port })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::get;
    use axum::Router;

    fn server() -> Arc<RelayServer> {
        Arc::new(RelayServer::new(RelayConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let relay = server();
        assert_eq!(relay.port(), None);

        let (a, b) = tokio::join!(relay.ensure_started(), relay.ensure_started());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a, b);
        assert_ne!(a, 0);
        assert_eq!(relay.ensure_started().await.unwrap(), a);
        assert_eq!(relay.port(), Some(a));
    }

    #[tokio::test]
    async fn test_empty_upstream_does_not_start() {
        let relay = server();
        let err = relay.relay_url("", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, ResolveError::RelayEncoding(_)));
        assert_eq!(relay.port(), None);
    }

    #[tokio::test]
    async fn test_crashed_relay_hands_out_no_urls() {
        let relay = server();
        relay.ensure_started().await.unwrap();
        relay.crashed.store(true, Ordering::SeqCst);

        assert!(matches!(
            relay.ensure_started().await,
            Err(ResolveError::RelayUnavailable(_))
        ));
        let err = relay
            .relay_url("https://cdn.example.com/a.m4a", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_rejected() {
        let config = RelayConfig {
            proxy: Some("not a proxy url".to_string()),
            ..RelayConfig::default()
        };
        assert!(matches!(
            RelayServer::new(config),
            Err(ResolveError::RelayUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_end_to_end_through_relay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream = format!("http://{}/track.mp3", listener.local_addr().unwrap());
        let app = Router::new().route(
            "/track.mp3",
            get(|headers: axum::http::HeaderMap| async move {
                let cookie = headers
                    .get("cookie")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string();
                ([("content-type", "audio/mpeg")], cookie)
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let relay = server();
        let headers = BTreeMap::from([("Cookie".to_string(), "sid=42".to_string())]);
        let url = relay.relay_url(&upstream, &headers).await.unwrap();
        assert!(url.starts_with(&format!("http://127.0.0.1:{}/proxy?", relay.port().unwrap())));

        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let response = client.get(&url).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "audio/mpeg");
        assert_eq!(response.text().await.unwrap(), "sid=42");
    }
}
