//! Prometheus exporter for Rainforest Eagle energy monitors.
//!
//! The exporter polls the Eagle's local API on a fixed interval, publishes
//! instantaneous demand (W), cumulative energy delivered (kWh) and the time
//! of the last good reading as gauges labelled by `host`, and retires those
//! gauges once the device has been silent for longer than the TTL.
//!
//! ## Example
//!
//! ```rust,no_run
//! use eagle_exporter::{Credentials, DeviceClient, ExporterConfig, MetricsServer, PollLoop};
//! use eagle_metrics::MetricsRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExporterConfig::default()
//!         .with_eagle_host("192.168.1.50")
//!         .with_credentials(Credentials::new("0077dd", "6e61a3a94882eef9", "0xd8d5b90000001234"));
//!
//!     let registry = MetricsRegistry::new();
//!     let listener = MetricsServer::bind(config.bind_addr()).await?;
//!     let server = MetricsServer::new(registry.clone());
//!     tokio::spawn(async move { server.serve(listener).await });
//!
//!     let client = DeviceClient::from_config(&config)?;
//!     let mut poll = PollLoop::new(client, &registry, config.metric_ttl(), config.poll_interval());
//!     poll.run().await;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod device;
pub mod error;
pub mod poller;
pub mod server;

// Re-export main types
pub use client::DeviceClient;
pub use config::{Credentials, ExporterConfig};
pub use device::{DeviceSource, FakeDevice, Reading};
pub use error::{ExporterError, ExporterResult, FailureKind, FetchError};
pub use poller::{CycleOutcome, PollLoop};
pub use server::MetricsServer;
