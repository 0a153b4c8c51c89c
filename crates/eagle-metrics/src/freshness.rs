//! Per-device time of last successful reading.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{MetricsError, Result};

/// Records when each device last produced a good reading.
///
/// An entry exists exactly while the device has live metrics. Timestamps
/// never move backwards: touching with an older time keeps the newer one.
#[derive(Debug, Default, Clone)]
pub struct FreshnessTracker {
    last_success: HashMap<String, DateTime<Utc>>,
}

impl FreshnessTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes the entry for `host`.
    pub fn touch(&mut self, host: &str, at: DateTime<Utc>) {
        self.last_success
            .entry(host.to_string())
            .and_modify(|last| *last = (*last).max(at))
            .or_insert(at);
    }

    /// Time elapsed between the last touch of `host` and `now`.
    ///
    /// A `now` earlier than the last touch yields zero.
    pub fn age(&self, host: &str, now: DateTime<Utc>) -> Result<Duration> {
        let last = self
            .last_success
            .get(host)
            .ok_or_else(|| MetricsError::NotTracked {
                host: host.to_string(),
            })?;
        Ok((now - *last).to_std().unwrap_or(Duration::ZERO))
    }

    /// Removes the entry for `host`, if any.
    pub fn forget(&mut self, host: &str) {
        self.last_success.remove(host);
    }

    /// Snapshot of the tracked devices.
    #[must_use]
    pub fn tracked_ids(&self) -> BTreeSet<String> {
        self.last_success.keys().cloned().collect()
    }

    /// Returns whether `host` has an entry.
    #[must_use]
    pub fn is_tracked(&self, host: &str) -> bool {
        self.last_success.contains_key(host)
    }

    /// Returns the last successful reading time for `host`.
    #[must_use]
    pub fn last_success(&self, host: &str) -> Option<DateTime<Utc>> {
        self.last_success.get(host).copied()
    }

    /// Number of tracked devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last_success.len()
    }

    /// Returns whether no device is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_success.is_empty()
    }
}
