//! Exported gauge series keyed by device.
//!
//! [`MetricStore`] owns the three gauge families the exporter serves
//! (`demand`, `summation_delivered`, `last_seen`) and an index of which
//! devices currently have series. Presence is always answered from the
//! index, so asking about a device never creates a zero-valued series in the
//! scrape output.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::registry::{DeviceGaugeFamily, HostLabels, MetricsRegistry};

/// Metric name for instantaneous demand.
pub const DEMAND: &str = "demand";
/// Metric name for cumulative energy delivered.
pub const SUMMATION_DELIVERED: &str = "summation_delivered";
/// Metric name for the time of the last successful reading.
pub const LAST_SEEN: &str = "last_seen";

/// The values currently exported for one device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedValues {
    /// Instantaneous demand in watts.
    pub demand_watts: f64,
    /// Cumulative energy delivered in kWh.
    pub summation_delivered_kwh: f64,
    /// Unix time, in seconds, of the reading.
    pub last_seen_unix_secs: f64,
}

/// Label-scoped gauge series for every device with live metrics.
pub struct MetricStore {
    demand: DeviceGaugeFamily,
    summation_delivered: DeviceGaugeFamily,
    last_seen: DeviceGaugeFamily,
    published: BTreeSet<String>,
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore")
            .field("published", &self.published)
            .finish_non_exhaustive()
    }
}

impl MetricStore {
    /// Creates the gauge families and registers them with `registry`.
    ///
    /// Call this once per registry; a second store on the same registry
    /// would register the metric names twice.
    #[must_use]
    pub fn new(registry: &MetricsRegistry) -> Self {
        let demand = DeviceGaugeFamily::default();
        registry.register_family(DEMAND, "demand in Watts", demand.clone());

        let summation_delivered = DeviceGaugeFamily::default();
        registry.register_family(
            SUMMATION_DELIVERED,
            "summation delivered in kWh",
            summation_delivered.clone(),
        );

        let last_seen = DeviceGaugeFamily::default();
        registry.register_family(
            LAST_SEEN,
            "unix time of the last successful reading",
            last_seen.clone(),
        );

        Self {
            demand,
            summation_delivered,
            last_seen,
            published: BTreeSet::new(),
        }
    }

    /// Sets all three series for `host`, overwriting previous values.
    pub fn publish(
        &mut self,
        host: &str,
        demand_watts: f64,
        summation_delivered_kwh: f64,
        observed_at: DateTime<Utc>,
    ) {
        let labels = HostLabels::new(host);
        let last_seen = unix_secs(observed_at);

        self.demand.get_or_create(&labels).set(demand_watts);
        self.summation_delivered
            .get_or_create(&labels)
            .set(summation_delivered_kwh);
        self.last_seen.get_or_create(&labels).set(last_seen);
        self.published.insert(host.to_string());

        debug!(
            host = %host,
            demand_watts,
            summation_delivered_kwh,
            last_seen,
            "published device metrics"
        );
    }

    /// Removes all three series for `host`.
    ///
    /// Retracting a device that has no series is a no-op. Returns whether
    /// anything was removed.
    pub fn retract(&mut self, host: &str) -> bool {
        let labels = HostLabels::new(host);

        // Remove from every family even if the index disagrees.
        let demand = self.demand.remove(&labels);
        let summation = self.summation_delivered.remove(&labels);
        let last_seen = self.last_seen.remove(&labels);
        let indexed = self.published.remove(host);

        demand || summation || last_seen || indexed
    }

    /// Returns whether `host` currently has series.
    #[must_use]
    pub fn is_published(&self, host: &str) -> bool {
        self.published.contains(host)
    }

    /// Returns the devices that currently have series.
    #[must_use]
    pub fn published_ids(&self) -> BTreeSet<String> {
        self.published.clone()
    }

    /// Returns the values exported for `host`, or `None` if it has no series.
    #[must_use]
    pub fn values(&self, host: &str) -> Option<PublishedValues> {
        if !self.is_published(host) {
            return None;
        }
        let labels = HostLabels::new(host);
        Some(PublishedValues {
            demand_watts: self.demand.get_or_create(&labels).get(),
            summation_delivered_kwh: self.summation_delivered.get_or_create(&labels).get(),
            last_seen_unix_secs: self.last_seen.get_or_create(&labels).get(),
        })
    }

    /// Returns the number of devices with series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.published.len()
    }

    /// Returns whether no device has series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}

fn unix_secs(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
