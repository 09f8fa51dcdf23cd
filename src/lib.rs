//! Resolves media page URLs to a single audio-only stream and serves it
//! through a loopback HTTP relay that adds the provider's request headers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use arbor_stream::config::Config;
//! use arbor_stream::resolver::extractors::InfoExtractorOrchestrator;
//! use arbor_stream::resolver::{RelayServer, StreamResolver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let relay = Arc::new(RelayServer::new(config.relay.clone())?);
//! let resolver = StreamResolver::new(Arc::new(InfoExtractorOrchestrator::new()), relay, &config);
//! let result = resolver.resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//! println!("{}", result.streaming_url);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod resolver;

pub use config::Config;
pub use resolver::{ResolutionResult, ResolveError, StreamResolver};
