use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    /// Deadline for each request's storage work; `0` disables it.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            storage: StorageConfig::InMemory,
            request_timeout_secs: 30,
        }
    }
}

/// Which storage driver backs the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum StorageConfig {
    InMemory,
    Filesystem { root_directory: PathBuf },
}
