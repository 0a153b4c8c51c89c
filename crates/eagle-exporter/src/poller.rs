//! The poll-publish-expire loop.
//!
//! Each cycle requests a reading from the device. A good reading updates the
//! metric store and the freshness tracker together and is followed by a TTL
//! sweep. A failed request is logged and changes nothing: metrics from the
//! last good reading stay exported until the sweep retires them. Every cycle
//! is followed by the same fixed sleep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use eagle_metrics::{
    ExpirySweeper, FreshnessTracker, MetricStore, MetricsRegistry, SweepReport,
};
use tracing::{debug, info, warn};

use crate::device::{DeviceSource, Reading};
use crate::error::{FailureKind, FetchError};

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The reading was published and a sweep ran.
    Published {
        /// The reading that was exported.
        reading: Reading,
        /// Result of the sweep that followed.
        sweep: SweepReport,
    },
    /// The request failed; nothing was published or swept.
    Failed(FailureKind),
}

impl CycleOutcome {
    /// Returns whether the cycle published a reading.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Drives one device through repeated poll cycles.
///
/// The loop owns the freshness tracker and metric store; nothing else
/// mutates them. The registry the store writes into can be shared with a
/// scrape server.
#[derive(Debug)]
pub struct PollLoop<S> {
    source: S,
    tracker: FreshnessTracker,
    store: MetricStore,
    sweeper: ExpirySweeper,
    interval: Duration,
}

impl<S: DeviceSource> PollLoop<S> {
    /// Creates a loop for `source`, registering its gauges with `registry`.
    ///
    /// Call once per registry.
    #[must_use]
    pub fn new(source: S, registry: &MetricsRegistry, ttl: Duration, interval: Duration) -> Self {
        let store = MetricStore::new(registry);
        Self::with_store(source, store, ExpirySweeper::new(ttl), interval)
    }

    /// Creates a loop around an existing store.
    ///
    /// Any series already in the store have no freshness entry and are
    /// retracted before the first cycle.
    #[must_use]
    pub fn with_store(
        source: S,
        mut store: MetricStore,
        sweeper: ExpirySweeper,
        interval: Duration,
    ) -> Self {
        let mut tracker = FreshnessTracker::new();
        let report = sweeper.reconcile(&mut tracker, &mut store);
        if !report.is_empty() {
            info!(
                retracted = report.retracted.len(),
                "retracted leftover metrics at startup"
            );
        }

        Self {
            source,
            tracker,
            store,
            sweeper,
            interval,
        }
    }

    /// The device being polled.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The freshness tracker.
    pub fn tracker(&self) -> &FreshnessTracker {
        &self.tracker
    }

    /// The metric store.
    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    /// Delay between cycles.
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one cycle, timestamping a successful reading with the current time.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let result = self.source.fetch().await;
        self.apply(result, Utc::now())
    }

    /// Runs one cycle as if the reading arrived at `now`.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        let result = self.source.fetch().await;
        self.apply(result, now)
    }

    /// Runs only the TTL sweep at `now`.
    pub fn sweep_at(&mut self, now: DateTime<Utc>) -> SweepReport {
        self.sweeper.sweep(now, &mut self.tracker, &mut self.store)
    }

    /// Polls forever with a fixed delay between cycles.
    pub async fn run(&mut self) {
        info!(
            host = %self.source.identity(),
            interval_secs = self.interval.as_secs_f64(),
            ttl_secs = self.sweeper.ttl().as_secs_f64(),
            "starting poll loop"
        );

        loop {
            self.run_cycle().await;
            debug!(interval_secs = self.interval.as_secs_f64(), "sleeping");
            tokio::time::sleep(self.interval).await;
        }
    }

    fn apply(&mut self, result: Result<Reading, FetchError>, now: DateTime<Utc>) -> CycleOutcome {
        match result {
            Ok(mut reading) => {
                reading.observed_at = now;
                let host = self.source.identity();
                self.store.publish(
                    host,
                    reading.demand_watts,
                    reading.summation_delivered_kwh,
                    reading.observed_at,
                );
                self.tracker.touch(host, reading.observed_at);

                let sweep = self.sweep_at(now);
                CycleOutcome::Published { reading, sweep }
            }
            Err(err) => {
                warn!(
                    host = %self.source.identity(),
                    kind = %err.kind(),
                    endpoint = %err.endpoint(),
                    status = ?err.status(),
                    error = %err,
                    "poll failed"
                );
                CycleOutcome::Failed(err.kind())
            }
        }
    }
}
