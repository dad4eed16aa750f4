//! WiFi session supervision.
//!
//! `connect()` runs once at boot and blocks for at most `max_attempts`
//! seconds. `maintain()` runs every tick, never blocks, and leaves retry
//! pacing to the WiFi driver. Neither ever fails: outcomes are events.

use log::debug;

use super::events::AppEvent;
use super::ports::{ConnectivityPort, DelayPort, EventSink};

/// Poll cadence while waiting for the boot-time join.
pub const JOIN_POLL_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub attempt_count: u32,
}

pub struct ConnectivitySupervisor {
    state: ConnectionState,
    max_attempts: u32,
}

impl ConnectivitySupervisor {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::default(),
            max_attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Blocking boot-time join: one status check per second up to the
    /// attempt ceiling. The process continues either way.
    pub fn connect(
        &mut self,
        wifi: &mut impl ConnectivityPort,
        delay: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) {
        self.state.attempt_count = 0;

        if let Err(e) = wifi.begin_join() {
            sink.emit(&AppEvent::WifiJoinRejected(e));
        }

        while !wifi.is_connected() && self.state.attempt_count < self.max_attempts {
            self.state.attempt_count += 1;
            delay.delay_ms(JOIN_POLL_MS);
        }

        self.state.connected = wifi.is_connected();
        let attempts = self.state.attempt_count;
        if self.state.connected {
            sink.emit(&AppEvent::WifiConnected {
                attempts,
                ip: wifi.ip_address(),
            });
        } else {
            sink.emit(&AppEvent::WifiConnectFailed { attempts });
        }
    }

    /// Per-tick liveness check. Re-issues a join while down; only state
    /// transitions produce events.
    pub fn maintain(&mut self, wifi: &mut impl ConnectivityPort, sink: &mut impl EventSink) -> bool {
        let up = wifi.is_connected();
        match (self.state.connected, up) {
            (true, false) => sink.emit(&AppEvent::WifiLost),
            (false, true) => sink.emit(&AppEvent::WifiRestored),
            _ => {}
        }
        self.state.connected = up;

        if !up {
            debug!("WiFi: down, re-issuing join");
            wifi.rejoin();
        }
        up
    }
}
