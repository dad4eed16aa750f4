//! Two-phase firmware update, run once per periodic firing.
//!
//! ```text
//!  Phase 1: GET version_url ──▶ same as cached? ──yes──▶ UpToDate
//!                                   │ no
//!                                   ▼
//!                         cache := candidate
//!                                   ▼
//!  Phase 2: pull firmware_url ──▶ Failed    → keep running
//!                             ──▶ NoUpdates → keep running
//!                             ──▶ Updated   → restart now
//! ```
//!
//! Both GETs skip server-chain validation. The cached version lives in
//! RAM only, so every boot starts from the compiled-in baseline.

use super::events::{AppEvent, VersionCheckFailure};
use super::ports::{
    EventSink, FirmwareUpdatePort, HttpClientPort, RestartPort, TextBody, TlsPolicy, UpdateError,
    UpdateOutcome,
};
use crate::version::{Version, VersionError, MAX_VERSION_LEN};

/// Read at most this much of the version body.
const VERSION_BODY_LIMIT: usize = 4 * MAX_VERSION_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// Offline; no request made.
    Skipped,
    Failed(VersionCheckFailure),
    UpToDate,
    /// Cache now holds the server's version.
    NewVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped,
    CheckFailed,
    UpToDate,
    UpdateFailed(UpdateError),
    NoUpdates,
    Restarted,
}

pub struct UpdateOrchestrator {
    current: Version,
    version_url: String,
    firmware_url: String,
}

impl UpdateOrchestrator {
    pub fn new(baseline: Version, version_url: String, firmware_url: String) -> Self {
        Self {
            current: baseline,
            version_url,
            firmware_url,
        }
    }

    /// Version the device believes it runs (or is about to run).
    pub fn current(&self) -> &Version {
        &self.current
    }

    /// Phase 1.
    pub fn check_version(
        &mut self,
        connected: bool,
        http: &mut impl HttpClientPort,
        sink: &mut impl EventSink,
    ) -> VersionCheck {
        if !connected {
            sink.emit(&AppEvent::VersionCheckSkipped);
            return VersionCheck::Skipped;
        }

        let candidate = match self.fetch_version(http) {
            Ok(v) => v,
            Err(failure) => {
                sink.emit(&AppEvent::VersionCheckFailed(failure));
                return VersionCheck::Failed(failure);
            }
        };

        if candidate == self.current {
            sink.emit(&AppEvent::FirmwareUpToDate {
                version: candidate,
            });
            return VersionCheck::UpToDate;
        }

        let previous = core::mem::replace(&mut self.current, candidate.clone());
        sink.emit(&AppEvent::FirmwareAvailable {
            previous,
            candidate,
        });
        VersionCheck::NewVersion
    }

    fn fetch_version(&self, http: &mut impl HttpClientPort) -> Result<Version, VersionCheckFailure> {
        let mut body = TextBody::new(VERSION_BODY_LIMIT);
        let status = http
            .get(&self.version_url, TlsPolicy::Insecure, &mut body)
            .map_err(VersionCheckFailure::Transport)?;
        if status != 200 {
            return Err(VersionCheckFailure::Status(status));
        }
        if body.truncated {
            return Err(VersionCheckFailure::Malformed(VersionError::TooLong));
        }
        Version::parse(&body.text()).map_err(VersionCheckFailure::Malformed)
    }

    /// Phase 2. On success the device restarts before this returns on
    /// hardware.
    pub fn perform_update(
        &mut self,
        updater: &mut impl FirmwareUpdatePort,
        restart: &mut impl RestartPort,
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        sink.emit(&AppEvent::UpdateStarted);
        match updater.update(&self.firmware_url) {
            UpdateOutcome::Failed(e) => {
                sink.emit(&AppEvent::UpdateFailed(e));
                CycleOutcome::UpdateFailed(e)
            }
            UpdateOutcome::NoUpdates => {
                sink.emit(&AppEvent::UpdateNotNeeded);
                CycleOutcome::NoUpdates
            }
            UpdateOutcome::Updated => {
                sink.emit(&AppEvent::UpdateSucceeded);
                sink.emit(&AppEvent::Restarting);
                restart.restart();
                CycleOutcome::Restarted
            }
        }
    }

    /// Phase 1, then Phase 2 only if the version changed.
    pub fn check_and_update(
        &mut self,
        connected: bool,
        http: &mut impl HttpClientPort,
        updater: &mut impl FirmwareUpdatePort,
        restart: &mut impl RestartPort,
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        match self.check_version(connected, http, sink) {
            VersionCheck::Skipped => CycleOutcome::Skipped,
            VersionCheck::Failed(_) => CycleOutcome::CheckFailed,
            VersionCheck::UpToDate => CycleOutcome::UpToDate,
            VersionCheck::NewVersion => self.perform_update(updater, restart, sink),
        }
    }
}
