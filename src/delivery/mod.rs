//! Telemetry delivery pool.
//!
//! The scheduler hands each serialized record to a worker and moves on;
//! workers POST it and log the outcome. Nothing flows back.
//!
//! ```text
//! ┌──────────────┐ try_send  ┌────────┐  block_on(receive)  ┌──────────┐
//! │  main loop   │──────────▶│ lane 0 │────────────────────▶│ worker 0 │──▶ POST
//! │ (round-robin)│──────────▶│ lane 1 │────────────────────▶│ worker 1 │──▶ POST
//! └──────────────┘           └────────┘                     └──────────┘
//! ```
//!
//! One bounded `embassy-sync` channel per worker keeps each lane a plain
//! single-consumer queue. Jobs own their endpoint and payload, so a
//! worker never reads state the main loop may touch afterwards.

pub mod worker;

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::config::MAX_WORKERS;

pub use worker::{deliver, spawn_workers};

/// Jobs buffered per worker before the scheduler starts dropping.
pub const LANE_DEPTH: usize = 4;

pub type Lane = Channel<CriticalSectionRawMutex, DeliveryJob, LANE_DEPTH>;

/// One telemetry POST, captured by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryJob {
    pub endpoint: String,
    pub payload: String,
}

pub struct DeliveryPool {
    lanes: Vec<Arc<Lane>>,
    next: usize,
}

impl DeliveryPool {
    /// `workers` is clamped to `1..=MAX_WORKERS`.
    pub fn new(workers: usize) -> Self {
        let n = workers.clamp(1, MAX_WORKERS);
        Self {
            lanes: (0..n).map(|_| Arc::new(Channel::new())).collect(),
            next: 0,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Shared handle to one lane, for the worker that drains it.
    pub fn lane(&self, index: usize) -> Option<Arc<Lane>> {
        self.lanes.get(index).cloned()
    }

    /// Queue a job on the next lane with room, starting after the lane
    /// used last. Never blocks; hands the job back if every lane is full.
    pub fn submit(&mut self, job: DeliveryJob) -> Result<usize, DeliveryJob> {
        let n = self.lanes.len();
        let mut job = job;
        for offset in 0..n {
            let index = (self.next + offset) % n;
            match self.lanes[index].try_send(job) {
                Ok(()) => {
                    self.next = (index + 1) % n;
                    return Ok(index);
                }
                Err(TrySendError::Full(back)) => job = back,
            }
        }
        Err(job)
    }

    /// Jobs waiting across all lanes.
    pub fn pending(&self) -> usize {
        self.lanes.iter().map(|lane| lane.len()).sum()
    }

    /// Pull one queued job without a worker, lanes in order.
    pub fn try_take(&self) -> Option<DeliveryJob> {
        self.lanes.iter().find_map(|lane| lane.try_receive().ok())
    }
}
