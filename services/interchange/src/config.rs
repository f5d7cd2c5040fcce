//! Configuration for the sensor interchange layer.
//!
//! This module provides configuration structures for connecting to the
//! stream log store and for the defaults the publishers and consumers apply.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to load configuration: {0}")]
    LoadError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// Which log store implementation to connect to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Redis,
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redis => "redis",
            BackendKind::Memory => "memory",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "store.backend".to_string(),
                message: format!("'{}' is not one of redis, memory", other),
            }),
        }
    }
}

/// Log store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Store host name
    #[serde(default = "default_host")]
    pub host: String,
    /// Store port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Logical database index
    #[serde(default)]
    pub database: i64,
    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            host: default_host(),
            port: default_port(),
            database: 0,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Connection URL understood by the redis client
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.database)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Stream names used by the publishers and the metropolis encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream carrying direction frames
    #[serde(default = "default_direction_stream")]
    pub direction: String,
    /// Stream carrying heatmaps
    #[serde(default = "default_heatmap_stream")]
    pub heatmap: String,
    /// Stream carrying metropolis minimal schema records
    #[serde(default = "default_metropolis_stream")]
    pub metropolis: String,
}

fn default_direction_stream() -> String {
    "detection".to_string()
}

fn default_heatmap_stream() -> String {
    "heatmap".to_string()
}

fn default_metropolis_stream() -> String {
    "metropolis".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            direction: default_direction_stream(),
            heatmap: default_heatmap_stream(),
            metropolis: default_metropolis_stream(),
        }
    }
}

/// Defaults applied by publishers and consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Approximate number of entries retained per stream
    #[serde(default = "default_bound")]
    pub bound: usize,
    /// How long a consumer blocks waiting for an entry, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Camera identifier stamped on direction frames
    pub camera_id: Option<String>,
    /// Frame width stamped on direction frames
    #[serde(default)]
    pub width: u32,
    /// Frame height stamped on direction frames
    #[serde(default)]
    pub height: u32,
    /// Sensor id for metropolis records
    #[serde(default = "default_sensor_id")]
    pub sensor_id: i64,
    /// Image size for metropolis records
    #[serde(default = "default_image_size")]
    pub image_size: (i64, i64),
}

fn default_bound() -> usize {
    1000
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_sensor_id() -> i64 {
    1
}

fn default_image_size() -> (i64, i64) {
    (-1, -1)
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            bound: default_bound(),
            read_timeout_ms: default_read_timeout_ms(),
            camera_id: None,
            width: 0,
            height: 0,
            sensor_id: default_sensor_id(),
            image_size: default_image_size(),
        }
    }
}

/// Main configuration for the interchange layer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InterchangeConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub streams: StreamConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

impl InterchangeConfig {
    /// Create a configuration pointing at the given store host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let mut config = Self::default();
        config.store.host = host.into();
        config.store.port = port;
        config
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("INTERCHANGE_STORE_HOST") {
            config.store.host = host;
        }

        if let Ok(port) = std::env::var("INTERCHANGE_STORE_PORT") {
            config.store.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTERCHANGE_STORE_PORT".to_string(),
                message: format!("'{}' is not a port number", port),
            })?;
        }

        if let Ok(backend) = std::env::var("INTERCHANGE_STORE_BACKEND") {
            config.store.backend = backend.parse()?;
        }

        if let Ok(stream) = std::env::var("INTERCHANGE_DIRECTION_STREAM") {
            config.streams.direction = stream;
        }
        if let Ok(stream) = std::env::var("INTERCHANGE_HEATMAP_STREAM") {
            config.streams.heatmap = stream;
        }
        if let Ok(stream) = std::env::var("INTERCHANGE_METROPOLIS_STREAM") {
            config.streams.metropolis = stream;
        }

        if let Ok(camera) = std::env::var("INTERCHANGE_CAMERA_ID") {
            config.publish.camera_id = Some(camera);
        }

        Ok(config)
    }

    /// Load configuration from an optional config file and `INTERCHANGE__` variables
    pub fn load() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/interchange").required(false))
            // INTERCHANGE__STORE__HOST -> store.host
            .add_source(
                config::Environment::with_prefix("INTERCHANGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Consumer read timeout as Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.publish.read_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == BackendKind::Redis && self.store.host.is_empty() {
            return Err(ConfigError::MissingRequired("store.host".to_string()));
        }

        for (key, name) in [
            ("streams.direction", &self.streams.direction),
            ("streams.heatmap", &self.streams.heatmap),
            ("streams.metropolis", &self.streams.metropolis),
        ] {
            if name.is_empty() {
                return Err(ConfigError::MissingRequired(key.to_string()));
            }
        }

        if self.publish.bound == 0 {
            return Err(ConfigError::InvalidValue {
                key: "publish.bound".to_string(),
                message: "must retain at least one entry".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InterchangeConfig::default();
        assert_eq!(config.store.host, "localhost");
        assert_eq!(config.store.port, 6379);
        assert_eq!(config.publish.bound, 1000);
        assert_eq!(config.read_timeout(), Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_url() {
        let config = InterchangeConfig::new("10.0.0.5", 6380);
        assert_eq!(config.store.url(), "redis://10.0.0.5:6380/0");
    }

    #[test]
    fn test_zero_bound_rejected() {
        let mut config = InterchangeConfig::default();
        config.publish.bound = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_stream_name_rejected() {
        let mut config = InterchangeConfig::default();
        config.streams.heatmap.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "streams.heatmap"
        ));
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("memory".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert_eq!("Redis".parse::<BackendKind>().unwrap(), BackendKind::Redis);
        assert!(matches!(
            "postgres".parse::<BackendKind>(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "store.backend"
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: InterchangeConfig =
            serde_json::from_str(r#"{"store": {"host": "redis", "backend": "memory"}}"#).unwrap();
        assert_eq!(config.store.host, "redis");
        assert_eq!(config.store.backend, BackendKind::Memory);
        assert_eq!(config.streams.direction, "detection");
        assert_eq!(config.publish.image_size, (-1, -1));
    }
}
