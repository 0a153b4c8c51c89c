//! Device readings and the source abstraction the poll loop depends on.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::FetchError;

/// One successful, well-formed reading from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Instantaneous demand in watts.
    pub demand_watts: f64,
    /// Cumulative energy delivered in kWh.
    pub summation_delivered_kwh: f64,
    /// When the reading was received.
    pub observed_at: DateTime<Utc>,
}

/// Something that can be polled for a [`Reading`].
pub trait DeviceSource {
    /// The device identity, used as the `host` label.
    fn identity(&self) -> &str;

    /// Performs one request and decodes the result.
    fn fetch(&self) -> impl Future<Output = Result<Reading, FetchError>> + Send;
}

/// Fake device for testing.
///
/// Returns scripted outcomes in order; once the script runs out every fetch
/// is a network error. Clones share the same script.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    identity: String,
    script: Arc<Mutex<VecDeque<Result<Reading, FetchError>>>>,
    fetches: Arc<Mutex<usize>>,
}

impl FakeDevice {
    /// Create a fake device with an empty script.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fetches: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a successful reading.
    #[must_use]
    pub fn with_reading(self, demand_watts: f64, summation_delivered_kwh: f64) -> Self {
        self.push_reading(demand_watts, summation_delivered_kwh);
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_failure(self, error: FetchError) -> Self {
        self.push_failure(error);
        self
    }

    /// Queue a successful reading on a shared handle.
    pub fn push_reading(&self, demand_watts: f64, summation_delivered_kwh: f64) {
        self.script.lock().push_back(Ok(Reading {
            demand_watts,
            summation_delivered_kwh,
            observed_at: Utc::now(),
        }));
    }

    /// Queue a failure on a shared handle.
    pub fn push_failure(&self, error: FetchError) {
        self.script.lock().push_back(Err(error));
    }

    /// Number of fetches performed so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock()
    }
}

impl DeviceSource for FakeDevice {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn fetch(&self) -> Result<Reading, FetchError> {
        *self.fetches.lock() += 1;
        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(FetchError::Network {
                endpoint: format!("fake://{}", self.identity),
                reason: "no scripted response".to_string(),
            })
        })
    }
}
