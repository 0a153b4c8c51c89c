//! Shared Prometheus registry for the exporter.
//!
//! The registry is written once at startup (when the gauge families are
//! registered) and read by the scrape path on every request. Series values
//! live inside the families, which synchronize themselves, so the loop can
//! update them while a scrape is encoding.
//!
//! # Example
//!
//! ```rust
//! use eagle_metrics::{MetricStore, MetricsRegistry};
//!
//! let registry = MetricsRegistry::new();
//! let mut store = MetricStore::new(&registry);
//!
//! store.publish("eagle1", 500.0, 12.0, chrono::Utc::now());
//!
//! let output = registry.encode().unwrap();
//! assert!(output.contains("demand{host=\"eagle1\"} 500.0"));
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::RwLock;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::error::{MetricsError, Result};

/// A floating point gauge.
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// A floating point gauge family keyed by device.
pub type DeviceGaugeFamily = Family<HostLabels, FloatGauge>;

/// Label set identifying the device a series belongs to.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HostLabels {
    /// The device identity (host or address that was polled).
    pub host: String,
}

impl HostLabels {
    /// Creates the label set for a device.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

/// Central Prometheus registry.
///
/// Cloning is cheap and every clone shares the same underlying registry, so
/// the scrape server and the poll loop can each hold one.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    registry: Arc<RwLock<Registry>>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device gauge family under `name`.
    pub(crate) fn register_family(&self, name: &str, help: &str, family: DeviceGaugeFamily) {
        self.registry.write().register(name, help, family);
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String> {
        let registry = self.registry.read();
        let mut buffer = String::new();
        encode(&mut buffer, &registry).map_err(|e| {
            tracing::error!(error = %e, "failed to encode prometheus metrics");
            MetricsError::Encode {
                reason: e.to_string(),
            }
        })?;
        Ok(buffer)
    }

    /// Returns the Content-Type header value for Prometheus metrics.
    #[must_use]
    pub const fn content_type() -> &'static str {
        "text/plain; version=0.0.4; charset=utf-8"
    }
}
