//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) and the delivery
//! workers emit these through the [`EventSink`](super::ports::EventSink)
//! port. They are the device's only operator-facing signal; adapters on
//! the other side decide how to render them.

use std::net::Ipv4Addr;

use super::ports::{ConnectivityError, HttpError, UpdateError};
use crate::version::{Version, VersionError};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Firmware came up (carries the compiled-in version).
    Booted { version: Version },

    // ── WiFi ──────────────────────────────────────────────
    /// Join request could not be issued at all.
    WifiJoinRejected(ConnectivityError),
    WifiConnected { attempts: u32, ip: Option<Ipv4Addr> },
    /// Attempt ceiling reached without a connection.
    WifiConnectFailed { attempts: u32 },
    WifiLost,
    WifiRestored,

    // ── Telemetry ─────────────────────────────────────────
    /// Record handed to a delivery worker.
    TelemetryQueued { endpoint: String },
    /// Every delivery lane was full; record discarded.
    TelemetryDropped { endpoint: String },
    /// Offline at dispatch time; nothing sent.
    TelemetrySkipped { endpoints: usize },
    TelemetrySent { endpoint: String, status: u16 },
    TelemetryFailed { endpoint: String, reason: DeliveryFailure },

    // ── Update ────────────────────────────────────────────
    VersionCheckSkipped,
    VersionCheckFailed(VersionCheckFailure),
    FirmwareUpToDate { version: Version },
    FirmwareAvailable { previous: Version, candidate: Version },
    UpdateStarted,
    UpdateFailed(UpdateError),
    UpdateNotNeeded,
    UpdateSucceeded,

    // ── Local push OTA ────────────────────────────────────
    LocalOtaReceived,

    Restarting,
}

/// Why one telemetry POST did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    Transport(HttpError),
    /// Server answered with a non-2xx status.
    Status(u16),
}

/// Why Phase 1 ended without a usable version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheckFailure {
    Transport(HttpError),
    Status(u16),
    Malformed(VersionError),
}

impl core::fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "error {} ({})", e.code(), e),
            Self::Status(status) => write!(f, "HTTP {status}"),
        }
    }
}

impl core::fmt::Display for VersionCheckFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "error {} ({})", e.code(), e),
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Malformed(e) => write!(f, "{e}"),
        }
    }
}
