use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{SealpostError, SealpostResult};
use crate::frame::{FrameLimits, MAX_ID_LEN, MAX_PAYLOAD_LEN};

/// Top-level configuration (loaded from sealpost.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealpostConfig {
    pub daemon: DaemonConfig,
    pub client: ClientConfig,
    pub wire: WireConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// TCP listen address for the blob listener (default: 0.0.0.0:8084)
    pub listen: String,
    /// Prometheus metrics endpoint (default: 127.0.0.1:9184)
    pub metrics_addr: Option<String>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Deadline for one whole connection exchange, in seconds
    pub connection_timeout_secs: u64,
    /// Concurrent connection cap (0 = unlimited)
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Listener address used when a command does not name one
    pub server: String,
    /// Deadline for dial + exchange, in seconds
    pub timeout_secs: u64,
}

/// Frame size caps, shared by listener and client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Largest accepted payload in bytes (default: 100 MiB)
    pub max_payload_bytes: u32,
    /// Largest accepted blob ID in bytes (default: 64 KiB)
    pub max_id_bytes: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8084".into(),
            metrics_addr: Some("127.0.0.1:9184".into()),
            log_level: "info".into(),
            log_format: "json".into(),
            connection_timeout_secs: 60,
            max_connections: 0,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8084".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: MAX_PAYLOAD_LEN,
            max_id_bytes: MAX_ID_LEN,
        }
    }
}

impl DaemonConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WireConfig {
    pub fn limits(&self) -> FrameLimits {
        FrameLimits {
            max_payload: self.max_payload_bytes,
            max_id: self.max_id_bytes,
        }
    }
}

impl SealpostConfig {
    /// Load from `path`. `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> SealpostResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            SealpostError::Config(format!("reading config {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map(Some).map_err(|e| {
            SealpostError::Config(format!("parsing config {}: {e}", path.display()))
        })
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    ///
    /// The fallback is reported through `tracing`, so call this after the
    /// subscriber is installed.
    pub fn load_or_default(path: &Path) -> SealpostResult<Self> {
        match Self::load(path)? {
            Some(config) => Ok(config),
            None => {
                warn_defaults(path);
                Ok(Self::default())
            }
        }
    }
}

/// Warn that `path` was missing and defaults are in effect.
pub fn warn_defaults(path: &Path) {
    tracing::warn!(path = %path.display(), "config file not found (using defaults)");
}
