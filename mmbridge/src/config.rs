//! Bridge configuration and JSON persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use mmbridge_proto::{DEFAULT_PORT, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding [`BridgeConfig::port`].
pub const ENV_PORT: &str = "MMBRIDGE_PORT";

/// Connection settings shared by clients and servers.
///
/// Missing keys in a configuration file take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct BridgeConfig {
    /// Host the server binds / the client connects to.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Connect + handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-request reply timeout in milliseconds; `None` waits forever.
    pub recv_timeout_ms: Option<u64>,
    /// Server version the client expects in the handshake.
    pub expected_version: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 500,
            recv_timeout_ms: None,
            expected_version: PROTOCOL_VERSION.to_owned(),
        }
    }
}

impl BridgeConfig {
    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|source| Error::Config {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)?;
        Ok(())
    }

    /// `{config_dir}/mmbridge/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mmbridge").join("config.json"))
    }

    /// Resolves the effective configuration.
    ///
    /// An explicit path must exist. Otherwise the default path is used when
    /// present, falling back to built-in defaults. [`ENV_PORT`] is applied
    /// last.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::load(&path)?,
                None => Self::default(),
            },
        };
        config.apply_port_override(std::env::var(ENV_PORT).ok().as_deref())?;
        Ok(config)
    }

    /// Replaces the port with `value` when set.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(raw) = value {
            self.port = raw.trim().parse().map_err(|_| Error::Env {
                var: ENV_PORT,
                value: raw.to_owned(),
            })?;
        }
        Ok(())
    }

    /// `host:port` address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect + handshake timeout.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-request reply timeout.
    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms.map(Duration::from_millis)
    }
}
