use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::tftp::core::OCTET;

/// Default TFTP server port
pub const DEFAULT_PORT: u16 = 69;

/// TFTP client configuration
///
/// Can be loaded from a TOML file; every key is optional:
///
/// ```toml
/// port = 69
/// timeout = "5s"
/// retries = 3
/// ```
///
/// # Example
///
/// ```rust
/// use xtftp::tftp::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default().with_timeout(Duration::from_secs(2));
/// assert_eq!(config.port, 69);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server port number
    pub port: u16,
    /// How long to wait for each reply
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Retransmissions allowed per exchange before giving up
    pub retries: u32,
    /// Transfer mode (only octet is supported)
    pub mode: String,
}

impl ClientConfig {
    /// Read configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        if !config.mode.eq_ignore_ascii_case(OCTET) {
            anyhow::bail!(
                "Unsupported transfer mode '{}', only octet is supported",
                config.mode
            );
        }
        Ok(config)
    }

    /// Apply command line overrides
    pub fn merge_cli(
        mut self,
        port: Option<u16>,
        timeout: Option<Duration>,
        retries: Option<u32>,
    ) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        if let Some(retries) = retries {
            self.retries = retries;
        }
        self
    }

    /// Set timeout duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retransmission budget
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
            retries: 3,
            mode: OCTET.to_string(),
        }
    }
}
