//! Service configuration, read from the environment (and `.env`, if present).

use crate::error::ConfigError;
use crate::notification::PushFormat;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `BIND_ADDR`, default `0.0.0.0`.
    pub bind_addr: IpAddr,
    /// `PORT`, default `8081`.
    pub port: u16,
    /// `PUSH_FORMAT`: `message` (default) or `event`.
    pub push_format: PushFormat,
    /// `LOG_JSON`: emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            push_format: PushFormat::Message,
            log_json: false,
        }
    }
}

impl Config {
    /// Loads `.env` into the process environment, then reads the variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup("BIND_ADDR") {
            config.bind_addr = value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "BIND_ADDR", value })?;
        }
        if let Some(value) = lookup("PORT") {
            config.port = value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?;
        }
        if let Some(value) = lookup("PUSH_FORMAT") {
            config.push_format = value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PUSH_FORMAT", value })?;
        }
        if let Some(value) = lookup("LOG_JSON") {
            config.log_json = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(ConfigError::Invalid { key: "LOG_JSON", value }),
            };
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
