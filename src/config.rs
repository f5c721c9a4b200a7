//! Server configuration, read from the environment.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime configuration for the clienthub server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the REST API binds on.
    pub bind_addr: IpAddr,
    /// Port for the REST API.
    pub port: u16,
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Origin allowed to call the API (the dashboard). None allows any.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            db_path: PathBuf::from("./data/clienthub.db"),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from `CLIENTHUB_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CLIENTHUB_BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CLIENTHUB_BIND_ADDR".to_string(),
                message: format!("not an IP address: {addr}"),
            })?;
        }

        if let Ok(port) = std::env::var("CLIENTHUB_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CLIENTHUB_PORT".to_string(),
                message: format!("not a port number: {port}"),
            })?;
        }

        if let Ok(path) = std::env::var("CLIENTHUB_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        config.cors_origin = std::env::var("CLIENTHUB_CORS_ORIGIN").ok();

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.cors_origin.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/clienthub.db"));
    }
}
