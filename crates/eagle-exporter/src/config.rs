//! Exporter configuration.
//!
//! Configuration can come from a TOML file, from command-line flags, or
//! both (flags win). Every field has a default, so an empty file is valid.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExporterError;

/// Default device host.
pub const DEFAULT_EAGLE_HOST: &str = "eagle";
/// Default port for the metrics endpoint.
pub const DEFAULT_LISTEN_PORT: u16 = 8002;
/// Default delay between polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Default metric time-to-live, in seconds.
pub const DEFAULT_METRIC_TTL_SECS: u64 = 5 * 60;
/// Default device request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Static credentials for the device's local API.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Basic-auth username (the device's cloud id).
    #[serde(default)]
    pub user: String,
    /// Basic-auth password (the device's install code).
    #[serde(default)]
    pub password: String,
    /// Hardware identifier of the meter, sent in every command.
    #[serde(default)]
    pub mac: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("mac", &self.mac)
            .finish()
    }
}

impl Credentials {
    /// Creates a credential set.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        mac: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            mac: mac.into(),
        }
    }
}

/// Main exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExporterConfig {
    /// Host (or `host:port`, or full base URL) of the device.
    pub eagle_host: String,
    /// Device credentials.
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Address the metrics server binds to.
    pub listen_addr: IpAddr,
    /// Port the metrics server binds to.
    pub listen_port: u16,
    /// Delay between polls in seconds.
    pub poll_interval_secs: u64,
    /// Seconds without a successful reading before a device's metrics are removed.
    pub metric_ttl_secs: u64,
    /// Per-request timeout for the device call in seconds.
    pub request_timeout_secs: u64,
    /// Enable debug logging.
    pub verbose: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            eagle_host: DEFAULT_EAGLE_HOST.to_string(),
            credentials: Credentials::default(),
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_LISTEN_PORT,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            metric_ttl_secs: DEFAULT_METRIC_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            verbose: false,
        }
    }
}

impl ExporterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExporterError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ExporterError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ExporterError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ExporterError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ExporterError> {
        if self.eagle_host.trim().is_empty() {
            return Err(ExporterError::Config(
                "eagle_host cannot be empty".to_string(),
            ));
        }

        if self.eagle_host.chars().any(char::is_whitespace) {
            return Err(ExporterError::Config(
                "eagle_host cannot contain whitespace".to_string(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(ExporterError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.metric_ttl_secs == 0 {
            return Err(ExporterError::Config(
                "metric_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ExporterError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Set the device host.
    #[must_use]
    pub fn with_eagle_host(mut self, host: impl Into<String>) -> Self {
        self.eagle_host = host.into();
        self
    }

    /// Set the device credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the metrics server port.
    #[must_use]
    pub const fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the poll interval in seconds.
    #[must_use]
    pub const fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Set the metric TTL in seconds.
    #[must_use]
    pub const fn with_metric_ttl_secs(mut self, secs: u64) -> Self {
        self.metric_ttl_secs = secs;
        self
    }

    /// Set the device request timeout in seconds.
    #[must_use]
    pub const fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Enable or disable debug logging.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Delay between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Metric time-to-live.
    #[must_use]
    pub const fn metric_ttl(&self) -> Duration {
        Duration::from_secs(self.metric_ttl_secs)
    }

    /// Device request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Socket address for the metrics server.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }
}
