//! Prometheus gauge store with per-device freshness tracking.
//!
//! `eagle-metrics` holds the state an energy-monitor exporter publishes and
//! the rules for retiring it:
//!
//! - [`MetricsRegistry`]: the shared prometheus-client registry that the
//!   scrape endpoint encodes.
//! - [`MetricStore`]: `demand`, `summation_delivered` and `last_seen` gauges
//!   labelled by `host`.
//! - [`FreshnessTracker`]: when each device last produced a good reading.
//! - [`ExpirySweeper`]: removes devices whose last reading is older than the
//!   TTL, from the tracker and the store together.
//!
//! # Example
//!
//! ```rust
//! use eagle_metrics::{ExpirySweeper, FreshnessTracker, MetricStore, MetricsRegistry};
//! use chrono::{Duration, Utc};
//!
//! let registry = MetricsRegistry::new();
//! let mut store = MetricStore::new(&registry);
//! let mut tracker = FreshnessTracker::new();
//! let sweeper = ExpirySweeper::default();
//!
//! let now = Utc::now();
//! store.publish("eagle1", 1234.0, 56.7, now);
//! tracker.touch("eagle1", now);
//!
//! let report = sweeper.sweep(now + Duration::seconds(301), &mut tracker, &mut store);
//! assert_eq!(report.expired.len(), 1);
//! assert!(!store.is_published("eagle1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod expiry;
pub mod freshness;
pub mod registry;
pub mod store;

// Re-export main types at crate root
pub use error::{MetricsError, Result};
pub use expiry::{DEFAULT_TTL, ExpiredDevice, ExpirySweeper, ReconcileReport, SweepReport};
pub use freshness::FreshnessTracker;
pub use registry::{HostLabels, MetricsRegistry};
pub use store::{MetricStore, PublishedValues};
