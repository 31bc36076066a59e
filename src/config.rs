//! Server configuration module
//! Handles dynamic configuration parameters for the relay server

use crate::constants::{
    DEFAULT_BUFFER_SIZE, DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_PORT, DEFAULT_READ_TIMEOUT_SECS,
};
use crate::error::{Result, RustyRelayError};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Storage backend selector: `"memory"` for the in-memory store,
    /// anything else is handed to the SQLite pool as a connection URL
    pub database_url: String,
    /// Upper bound on concurrently served connections
    pub max_connections: usize,
    /// Initial capacity of the per-connection decode buffer
    pub buffer_size: usize,
    /// Idle read timeout per connection; an expiry closes that connection only
    pub read_timeout: Duration,
}

impl ServerConfig {
    /// Create a configuration suitable for tests: loopback host, ephemeral
    /// port, in-memory storage
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "memory".to_string(),
            max_connections: 16,
            buffer_size: 1024,
            read_timeout: Duration::from_secs(5),
        }
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("RUSTY_RELAY_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("RUSTY_RELAY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let database_url =
            env::var("RUSTY_RELAY_DATABASE_URL").unwrap_or(DEFAULT_DATABASE_URL.to_string());

        let max_connections = env::var("RUSTY_RELAY_MAX_CONN")
            .ok()
            .and_then(|c| c.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let buffer_size = env::var("RUSTY_RELAY_BUFFER")
            .ok()
            .and_then(|b| b.parse().ok())
            .unwrap_or(DEFAULT_BUFFER_SIZE);

        let timeout_secs = env::var("RUSTY_RELAY_TIMEOUT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECS);

        if max_connections == 0 {
            return Err(RustyRelayError::ConfigError(
                "RUSTY_RELAY_MAX_CONN must be greater than zero".to_string(),
            ));
        }

        if buffer_size == 0 {
            return Err(RustyRelayError::ConfigError(
                "RUSTY_RELAY_BUFFER must be greater than zero".to_string(),
            ));
        }

        if database_url.is_empty() {
            return Err(RustyRelayError::ConfigError(
                "RUSTY_RELAY_DATABASE_URL must not be empty".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            buffer_size,
            read_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_testing_uses_ephemeral_port_and_memory_backend() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.port, 0);
        assert_eq!(config.database_url, "memory");
    }

    // Single test so the process-global environment is not mutated concurrently
    #[test]
    fn test_from_env_defaults_and_validation() {
        env::remove_var("RUSTY_RELAY_HOST");
        env::remove_var("RUSTY_RELAY_PORT");
        env::remove_var("RUSTY_RELAY_MAX_CONN");
        env::remove_var("RUSTY_RELAY_BUFFER");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);

        env::set_var("RUSTY_RELAY_MAX_CONN", "0");
        let result = ServerConfig::from_env();
        env::remove_var("RUSTY_RELAY_MAX_CONN");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("RUSTY_RELAY_MAX_CONN"));
    }
}
