//! Configuration loaded from `config.toml`.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup: the relay binds an OS-assigned loopback port and the
//! extractor runs in auto mode.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::extractors::ExtractorConfig;
use crate::resolver::models::SelectionConstraints;

pub const APP_DIR: &str = "arbor-stream";
pub const CONFIG_FILE: &str = "config.toml";

/// Desktop browser UA used when neither the provider nor the client sent one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub selection: SelectionConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Explicit path, else the per-user config file if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config dir>/arbor-stream/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }
}

/// Which streams are acceptable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Most preferred first
    pub preferred_containers: Vec<String>,
    /// extractor_key -> format_id known to be a good progressive audio stream
    pub pinned_formats: BTreeMap<String, String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            preferred_containers: SelectionConstraints::streaming().preferred_containers,
            // itag 140: AAC-LC 128k in m4a
            pinned_formats: BTreeMap::from([("Youtube".to_string(), "140".to_string())]),
        }
    }
}

impl SelectionConfig {
    pub fn constraints_for(&self, extractor_key: Option<&str>) -> SelectionConstraints {
        let pinned = extractor_key.and_then(|key| {
            self.pinned_formats
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, id)| id.clone())
        });

        SelectionConstraints::new(self.preferred_containers.iter().map(String::as_str))
            .with_preferred_format_id(pinned)
    }

    /// Audio-download preset with the same pinned format ids
    pub fn download_constraints_for(&self, extractor_key: Option<&str>) -> SelectionConstraints {
        let pinned = self.constraints_for(extractor_key).preferred_format_id;
        SelectionConstraints::audio_download().with_preferred_format_id(pinned)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 0 lets the OS pick a free port
    pub port: u16,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Upper bound of a single relayed body frame
    pub chunk_size: usize,
    /// Outbound proxy for upstream fetches (http://, socks5://)
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 0,
            connect_timeout_secs: 10,
            read_timeout_secs: 60,
            chunk_size: 64 * 1024,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Extra EnvFilter directives, e.g. "hyper=warn,reqwest=warn"
    pub filters: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filters: None,
        }
    }
}
