//! Periodic-phase gate for the main loop.
//!
//! The main loop ticks every few milliseconds; the telemetry and update
//! phases run only when a full interval has elapsed on the monotonic
//! clock.
//!
//! ```text
//!   tick ─▶ ScheduleClock::poll(now) ──false──▶ (cheap work only)
//!                     │
//!                   true
//!                     ▼
//!        dispatch telemetry ─▶ check for update
//! ```

use log::debug;

/// Default firing interval.
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

// ═══════════════════════════════════════════════════════════════
//  Schedule clock
// ═══════════════════════════════════════════════════════════════

/// Interval gate over a monotonic millisecond clock.
///
/// `last_fired_at_ms` starts at zero, so the first firing happens once
/// the clock passes one interval after boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleClock {
    last_fired_at_ms: u64,
    interval_ms: u64,
}

impl ScheduleClock {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            last_fired_at_ms: 0,
            interval_ms,
        }
    }

    /// Returns `true` when the periodic phase should run now.
    ///
    /// Firing and resetting `last_fired_at_ms` happen in the same call, so
    /// a second poll with the same `now_ms` never fires again. A clock
    /// that reads earlier than the last firing never fires.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_at_ms) >= self.interval_ms {
            debug!(
                "Scheduler: periodic fire at {}ms (last {}ms, every {}ms)",
                now_ms, self.last_fired_at_ms, self.interval_ms
            );
            self.last_fired_at_ms = now_ms;
            true
        } else {
            false
        }
    }

    pub fn last_fired_at_ms(&self) -> u64 {
        self.last_fired_at_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

impl Default for ScheduleClock {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_MS)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
