//! Application service: the hexagonal core and main-loop body.
//!
//! [`AppService`] owns every piece of mutable state the loop needs: the
//! connection state, the schedule clock, the cached firmware version and
//! the delivery pool. All I/O flows through port traits passed in at
//! call sites, so the whole loop runs against mocks on the host.
//!
//! ```text
//!  ConnectivityPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  LocalOtaPort     ──▶ │        AppService         │
//!  ClockPort        ──▶ │ supervisor · schedule ·   │ ──▶ DeliveryPool ──▶ workers
//!  HttpClientPort   ◀──▶│ telemetry · update        │
//!  FirmwareUpdate   ◀── │                           │ ──▶ RestartPort
//!                       └──────────────────────────┘
//! ```

use log::info;
use rand::Rng;

use crate::config::DeviceConfig;
use crate::delivery::DeliveryPool;
use crate::scheduler::ScheduleClock;
use crate::version::Version;

use super::connectivity::{ConnectionState, ConnectivitySupervisor};
use super::events::AppEvent;
use super::ports::{
    ClockPort, ConnectivityPort, DelayPort, EventSink, FirmwareUpdatePort, HttpClientPort,
    LocalOtaPort, LocalOtaStatus, RestartPort,
};
use super::telemetry::{DispatchSummary, TelemetryDispatcher};
use super::update::{CycleOutcome, UpdateOrchestrator};

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Every adapter the per-tick loop touches. Fields are public so a
/// caller can inspect mocks between ticks.
pub struct DeviceIo<W, L, C, H, U, R> {
    pub wifi: W,
    pub local_ota: L,
    pub clock: C,
    pub http: H,
    pub updater: U,
    pub restart: R,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub connected: bool,
    /// The periodic phase ran.
    pub fired: bool,
    pub dispatch: Option<DispatchSummary>,
    pub update: Option<CycleOutcome>,
    /// A restart was requested (pulled or pushed image).
    pub restarted: bool,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<G> {
    supervisor: ConnectivitySupervisor,
    schedule: ScheduleClock,
    telemetry: TelemetryDispatcher<G>,
    update: UpdateOrchestrator,
    pool: DeliveryPool,
}

impl<G: Rng> AppService<G> {
    pub fn new(config: &DeviceConfig, rng: G) -> Self {
        let id = &config.identity;
        Self {
            supervisor: ConnectivitySupervisor::new(config.connect_attempts),
            schedule: ScheduleClock::new(config.interval_ms),
            telemetry: TelemetryDispatcher::new(id.telemetry_urls.clone(), rng),
            update: UpdateOrchestrator::new(
                Version::baseline(),
                id.version_url.clone(),
                id.firmware_url.clone(),
            ),
            pool: DeliveryPool::new(config.delivery_workers),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn connection(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn firmware_version(&self) -> &Version {
        self.update.current()
    }

    pub fn schedule(&self) -> &ScheduleClock {
        &self.schedule
    }

    /// Lanes the delivery workers drain.
    pub fn pool(&self) -> &DeliveryPool {
        &self.pool
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot: announce the build and run the blocking WiFi join.
    pub fn setup(
        &mut self,
        wifi: &mut impl ConnectivityPort,
        delay: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) {
        sink.emit(&AppEvent::Booted {
            version: self.update.current().clone(),
        });
        self.supervisor.connect(wifi, delay, sink);
        info!(
            "AppService ready (interval={}ms, endpoints={})",
            self.schedule.interval_ms(),
            self.telemetry.endpoints().len()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One main-loop iteration. Cheap unless the interval has elapsed.
    pub fn tick<W, L, C, H, U, R>(
        &mut self,
        io: &mut DeviceIo<W, L, C, H, U, R>,
        sink: &mut impl EventSink,
    ) -> TickReport
    where
        W: ConnectivityPort,
        L: LocalOtaPort,
        C: ClockPort,
        H: HttpClientPort,
        U: FirmwareUpdatePort,
        R: RestartPort,
    {
        let mut report = TickReport {
            connected: self.supervisor.maintain(&mut io.wifi, sink),
            ..TickReport::default()
        };

        match io.local_ota.poll() {
            LocalOtaStatus::ReadyToRestart => {
                sink.emit(&AppEvent::LocalOtaReceived);
                sink.emit(&AppEvent::Restarting);
                io.restart.restart();
                report.restarted = true;
                return report;
            }
            // A push owns the inactive slot; the periodic phase waits for
            // the first tick after it ends.
            LocalOtaStatus::InProgress => return report,
            LocalOtaStatus::Idle => {}
        }

        if !self.schedule.poll(io.clock.monotonic_ms()) {
            return report;
        }
        report.fired = true;

        report.dispatch = Some(self.telemetry.dispatch_all(
            report.connected,
            &io.clock,
            &mut self.pool,
            sink,
        ));

        let outcome = self.update.check_and_update(
            report.connected,
            &mut io.http,
            &mut io.updater,
            &mut io.restart,
            sink,
        );
        report.restarted = outcome == CycleOutcome::Restarted;
        report.update = Some(outcome);
        report
    }
}
