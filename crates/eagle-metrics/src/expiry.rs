//! TTL enforcement over tracked devices.
//!
//! The sweeper keeps [`FreshnessTracker`] and [`MetricStore`] in lockstep: a
//! device either has a freshness entry and all three gauge series, or
//! neither. The tracker is authoritative when the two disagree.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::freshness::FreshnessTracker;
use crate::store::MetricStore;

/// Default time-to-live for a device's metrics.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A device removed by a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredDevice {
    /// The device identity.
    pub host: String,
    /// Time since its last successful reading when it was removed.
    pub age: Duration,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Devices whose series were retracted because they had no freshness entry.
    pub retracted: Vec<String>,
    /// Devices forgotten because they had no series.
    pub forgotten: Vec<String>,
}

impl ReconcileReport {
    /// Returns whether the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retracted.is_empty() && self.forgotten.is_empty()
    }
}

/// Outcome of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Devices removed because their age exceeded the TTL.
    pub expired: Vec<ExpiredDevice>,
    /// Mismatches repaired before the TTL check.
    pub reconciled: ReconcileReport,
}

/// Removes devices that have not produced a reading within the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirySweeper {
    ttl: Duration,
}

impl Default for ExpirySweeper {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ExpirySweeper {
    /// Creates a sweeper with the given TTL.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// The TTL shared by all devices.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Repairs any disagreement between the tracker and the store.
    ///
    /// Series without a freshness entry are retracted. Freshness entries
    /// without series are forgotten, since there are no values to restore.
    pub fn reconcile(
        &self,
        tracker: &mut FreshnessTracker,
        store: &mut MetricStore,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for host in store.published_ids() {
            if !tracker.is_tracked(&host) {
                store.retract(&host);
                warn!(host = %host, "retracted metrics with no freshness entry");
                report.retracted.push(host);
            }
        }

        for host in tracker.tracked_ids() {
            if !store.is_published(&host) {
                tracker.forget(&host);
                warn!(host = %host, "forgot freshness entry with no metrics");
                report.forgotten.push(host);
            }
        }

        report
    }

    /// Removes every device whose age at `now` is strictly greater than the TTL.
    pub fn sweep(
        &self,
        now: DateTime<Utc>,
        tracker: &mut FreshnessTracker,
        store: &mut MetricStore,
    ) -> SweepReport {
        let reconciled = self.reconcile(tracker, store);
        let mut expired = Vec::new();

        for host in tracker.tracked_ids() {
            let Ok(age) = tracker.age(&host, now) else {
                continue;
            };
            if age > self.ttl {
                info!(host = %host, age_secs = age.as_secs_f64(), "removing stale eagle");
                store.retract(&host);
                tracker.forget(&host);
                expired.push(ExpiredDevice { host, age });
            }
        }

        SweepReport {
            expired,
            reconciled,
        }
    }
}
