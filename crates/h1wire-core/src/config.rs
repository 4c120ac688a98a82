//! Server configuration, loadable from TOML

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Initial size of each connection's reassembly buffer
    pub read_buffer_size: usize,
    /// Runtime worker threads
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 42069,
            read_buffer_size: 1024,
            workers: num_cpus::get(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ServerConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(Error::Config("read_buffer_size must be positive".into()));
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be positive".into()));
        }
        Ok(())
    }

    /// `hostname:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Resolve the listen address; the first resolved address wins
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = self.addr();
        addr.to_socket_addrs()
            .map_err(|source| Error::Bind {
                addr: addr.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| Error::Config(format!("{addr} resolved to no addresses")))
    }
}
