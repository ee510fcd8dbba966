use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MAX_BODY_BYTES;
use crate::Error;
use crate::Result;

/// HTTP front-end configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Default: "127.0.0.1"
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Default: 8080
    #[serde(default = "default_port")]
    pub port: u16,

    /// Mount prefix of the application, e.g. "/shop". Empty mounts at the root.
    #[serde(default)]
    pub context_path: String,

    /// Default: false
    #[serde(default)]
    pub enable_metrics: bool,

    /// Default: 9090
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Directory receiving `click.log`. Logs go to stdout when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Trust the `X-Remote-User` / `X-Remote-Roles` headers. Enable only
    /// behind an authenticating proxy that sets them and strips client
    /// supplied copies. Default: false
    #[serde(default)]
    pub trusted_proxy: bool,

    /// Largest request body accepted, in bytes. Default: 2 MiB
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            port: default_port(),
            context_path: String::new(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
            log_dir: None,
            trusted_proxy: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.parse::<IpAddr>().is_err() {
            return Err(Error::Config(ConfigError::Message(format!(
                "invalid listen_address: {}",
                self.listen_address
            ))));
        }

        if !self.context_path.is_empty()
            && (!self.context_path.starts_with('/') || self.context_path.ends_with('/'))
        {
            return Err(Error::Config(ConfigError::Message(format!(
                "context_path must start with '/' and must not end with '/': {}",
                self.context_path
            ))));
        }

        if self.max_body_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "max_body_bytes must be greater than 0".into(),
            )));
        }

        if self.enable_metrics && self.metrics_port == self.port {
            return Err(Error::Config(ConfigError::Message(
                "metrics_port conflicts with port".into(),
            )));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_address.parse().map_err(|_| {
            Error::Config(ConfigError::Message(format!(
                "invalid listen_address: {}",
                self.listen_address
            )))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9090
}
fn default_max_body_bytes() -> u64 {
    DEFAULT_MAX_BODY_BYTES
}
