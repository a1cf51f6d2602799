use std::{env, net::SocketAddr};

use thiserror::Error;

use crate::mcp::transport::TransportConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub json_response: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_JSON_RESPONSE must be one of: true, false, 1, 0")]
    InvalidJsonResponse,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = lookup("BIND_PORT")
            .map(|value| value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let json_response = lookup("MCP_JSON_RESPONSE")
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .map(|value| match value.as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ConfigError::InvalidJsonResponse),
            })
            .transpose()?
            .unwrap_or(true);

        let config = Self {
            bind_addr,
            bind_port,
            json_response,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            session_id_generator: None,
            enable_json_response: self.json_response,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn parse_defaults() {
        let config = Config::from_lookup(lookup(&[])).expect("config should parse");
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert!(config.json_response);
        assert!(config.transport_config().session_id_generator.is_none());
    }

    #[test]
    fn invalid_port_fails() {
        let err = Config::from_lookup(lookup(&[("BIND_PORT", "http")]))
            .expect_err("expected invalid port error");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = Config::from_lookup(lookup(&[("BIND_ADDR", "not an address")]))
            .expect_err("expected invalid socket error");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }

    #[test]
    fn json_response_can_be_disabled() {
        let config = Config::from_lookup(lookup(&[("MCP_JSON_RESPONSE", "FALSE")]))
            .expect("config should parse");
        assert!(!config.transport_config().enable_json_response);
    }

    #[test]
    fn invalid_json_response_fails() {
        let err = Config::from_lookup(lookup(&[("MCP_JSON_RESPONSE", "maybe")]))
            .expect_err("expected invalid json response flag");
        assert!(matches!(err, ConfigError::InvalidJsonResponse));
    }
}
