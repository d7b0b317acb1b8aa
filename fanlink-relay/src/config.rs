use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the telemetry datagrams arrive on.
    pub udp_addr: SocketAddr,
    /// Address WebSocket subscribers connect to.
    pub ws_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            udp_addr: SocketAddr::from(([0, 0, 0, 0], 5625)),
            ws_addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Receive buffer size in bytes; longer datagrams are truncated.
    pub buffer_size: usize,
    /// Capacity of the channel between ingest and broadcast.
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            buffer_size: 65_535,
            channel_capacity: 100,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.buffer_size == 0 {
            return Err(ConfigError::Invalid("ingest.buffer_size must be positive"));
        }
        if self.ingest.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "ingest.channel_capacity must be positive",
            ));
        }
        Ok(())
    }
}
