//! Telemetry records and per-interval dispatch.
//!
//! Values are random stand-ins for a sensor reading. Only their range
//! and label set are meaningful.

use chrono::DateTime;
use log::warn;
use rand::Rng;
use serde::Serialize;

use super::events::AppEvent;
use super::ports::{ClockPort, EventSink};
use crate::delivery::{DeliveryJob, DeliveryPool};

/// Sent when the wall clock has not been synchronised.
pub const UNSYNCED_TIMESTAMP: &str = "0000-00-00T00:00:00Z";

/// 2020-01-01T00:00:00Z. Anything earlier means SNTP has not run yet.
pub const EPOCH_2020: u64 = 1_577_836_800;

pub const VALUE_MIN: u8 = 1;
pub const VALUE_MAX: u8 = 20;

/// The two fixed category labels. Wire names are what the collectors
/// already index on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    #[serde(rename = "merdouille")]
    Primary,
    #[serde(rename = "commo on")]
    Secondary,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "merdouille",
            Self::Secondary => "commo on",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: String,
    pub value: u8,
    #[serde(rename = "type")]
    pub category: Category,
}

impl TelemetryRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// RFC 3339 UTC with a literal `Z`, or the sentinel when unsynced.
pub fn format_timestamp(unix_secs: Option<u64>) -> String {
    unix_secs
        .filter(|&secs| secs >= EPOCH_2020)
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || UNSYNCED_TIMESTAMP.to_owned(),
            |dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        )
}

/// What one periodic firing did with its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    pub queued: usize,
    pub dropped: usize,
    /// Offline: nothing was built or queued.
    pub skipped: bool,
}

pub struct TelemetryDispatcher<R> {
    endpoints: Vec<String>,
    rng: R,
}

impl<R: Rng> TelemetryDispatcher<R> {
    pub fn new(endpoints: Vec<String>, rng: R) -> Self {
        Self { endpoints, rng }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Build one fresh record.
    pub fn sample(&mut self, unix_secs: Option<u64>) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: format_timestamp(unix_secs),
            value: self.rng.gen_range(VALUE_MIN..=VALUE_MAX),
            category: if self.rng.gen_bool(0.5) {
                Category::Primary
            } else {
                Category::Secondary
            },
        }
    }

    /// One record per endpoint, each queued for a worker. Never waits on
    /// the network.
    pub fn dispatch_all(
        &mut self,
        connected: bool,
        clock: &impl ClockPort,
        pool: &mut DeliveryPool,
        sink: &mut impl EventSink,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if !connected {
            summary.skipped = true;
            sink.emit(&AppEvent::TelemetrySkipped {
                endpoints: self.endpoints.len(),
            });
            return summary;
        }

        let now = clock.unix_time_secs();
        for i in 0..self.endpoints.len() {
            let record = self.sample(now);
            let endpoint = self.endpoints[i].clone();
            let payload = match record.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("TELEM | serialize failed for {}: {}", endpoint, e);
                    summary.dropped += 1;
                    continue;
                }
            };
            match pool.submit(DeliveryJob { endpoint, payload }) {
                Ok(_) => {
                    summary.queued += 1;
                    sink.emit(&AppEvent::TelemetryQueued {
                        endpoint: self.endpoints[i].clone(),
                    });
                }
                Err(job) => {
                    summary.dropped += 1;
                    sink.emit(&AppEvent::TelemetryDropped {
                        endpoint: job.endpoint,
                    });
                }
            }
        }
        summary
    }
}
