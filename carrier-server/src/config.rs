//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via CARRIER_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serving configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Service name, shown in startup lines.
    pub name: String,
    /// Address to bind to.
    pub ip: IpAddr,
    /// Port to bind to.
    pub port: u16,
    /// Per-connection header read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Decorate every response with permissive CORS headers.
    pub with_cors: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            name: "carrier".to_string(),
            ip: IpAddr::from([0, 0, 0, 0]),
            port: 8000,
            read_timeout_secs: 15,
            with_cors: false,
        }
    }
}

impl ServeConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CARRIER_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ServeConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("CARRIER_NAME") {
            if !name.is_empty() {
                self.name = name;
            }
        }

        if let Ok(ip) = std::env::var("CARRIER_IP") {
            if let Ok(parsed) = ip.parse() {
                self.ip = parsed;
            }
        }

        if let Ok(port) = std::env::var("CARRIER_HTTP_PORT") {
            if let Ok(n) = port.parse() {
                self.port = n;
            }
        }

        if let Ok(timeout) = std::env::var("CARRIER_READ_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.read_timeout_secs = secs;
            }
        }

        if let Ok(cors) = std::env::var("CARRIER_CORS") {
            self.with_cors = cors == "1" || cors.to_lowercase() == "true";
        }
    }

    /// Returns the bind address.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Returns the header read timeout as Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServeConfig::default();
        assert_eq!(config.name, "carrier");
        assert_eq!(config.bind_addr().port(), 8000);
        assert_eq!(config.read_timeout(), Duration::from_secs(15));
        assert!(!config.with_cors);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ServeConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ServeConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.ip, config.ip);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let parsed: ServeConfig = serde_yaml::from_str("port: 9001\nwith_cors: true\n").unwrap();
        assert_eq!(parsed.port, 9001);
        assert!(parsed.with_cors);
        assert_eq!(parsed.name, "carrier");
        assert_eq!(parsed.read_timeout_secs, 15);
    }
}
