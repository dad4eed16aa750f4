//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event to the
//! ESP-IDF logger (UART / USB-CDC in production). One line per event,
//! prefixed with a subsystem tag so the serial console stays greppable.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
///
/// Stateless, so each delivery worker gets its own copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted { version } => {
                info!("BOOT | fieldlink v{}", version);
            }
            AppEvent::WifiJoinRejected(e) => {
                warn!("WIFI | join request rejected: {}", e);
            }
            AppEvent::WifiConnected { attempts, ip } => match ip {
                Some(ip) => info!("WIFI | connected after {} attempt(s), IP {}", attempts, ip),
                None => info!("WIFI | connected after {} attempt(s)", attempts),
            },
            AppEvent::WifiConnectFailed { attempts } => {
                warn!("WIFI | connection failed after {} attempt(s)", attempts);
            }
            AppEvent::WifiLost => warn!("WIFI | link lost, rejoining"),
            AppEvent::WifiRestored => info!("WIFI | link restored"),
            AppEvent::TelemetryQueued { endpoint } => {
                log::debug!("TELEM | queued for {}", endpoint);
            }
            AppEvent::TelemetryDropped { endpoint } => {
                warn!("TELEM | all workers busy, dropped record for {}", endpoint);
            }
            AppEvent::TelemetrySkipped { endpoints } => {
                log::debug!("TELEM | offline, skipped {} endpoint(s)", endpoints);
            }
            AppEvent::TelemetrySent { endpoint, status } => {
                info!("TELEM | data sent to {} (HTTP {})", endpoint, status);
            }
            AppEvent::TelemetryFailed { endpoint, reason } => {
                warn!("TELEM | request to {} failed: {}", endpoint, reason);
            }
            AppEvent::VersionCheckSkipped => log::debug!("OTA | offline, version check skipped"),
            AppEvent::VersionCheckFailed(reason) => {
                warn!("OTA | version check failed: {}", reason);
            }
            AppEvent::FirmwareUpToDate { version } => {
                info!("OTA | already on the latest firmware ({})", version);
            }
            AppEvent::FirmwareAvailable {
                previous,
                candidate,
            } => {
                info!("OTA | new firmware detected: {} -> {}", previous, candidate);
            }
            AppEvent::UpdateStarted => info!("OTA | starting firmware update"),
            AppEvent::UpdateFailed(e) => {
                error!("OTA | HTTP_UPDATE_FAILED Error ({}): {}", e.code(), e);
            }
            AppEvent::UpdateNotNeeded => info!("OTA | HTTP_UPDATE_NO_UPDATES: no update available"),
            AppEvent::UpdateSucceeded => info!("OTA | HTTP_UPDATE_OK: firmware updated successfully"),
            AppEvent::LocalOtaReceived => info!("OTA | image pushed over LAN and flashed"),
            AppEvent::Restarting => warn!("BOOT | restarting"),
        }
    }
}
