//! fieldlink firmware: main entry point.
//!
//! Hexagonal layout: the application core only sees port traits, and
//! this file wires the ESP-IDF adapters into them.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiAdapter     EspHttpAdapter   SystemClock    LogEventSink   │
//! │  (Connectivity)  (HttpClient)     (Clock+Delay)  (EventSink)    │
//! │  LocalOtaListener  HttpUpdater      DeviceRestart               │
//! │  (LocalOta)        (FirmwareUpdate) (Restart)                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Connectivity · Schedule · Telemetry · Update          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Delivery workers (core 0) drain the telemetry lanes           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use embedded_hal::digital::PinState;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use fieldlink::adapters::http::EspHttpAdapter;
use fieldlink::adapters::local_ota::LocalOtaListener;
use fieldlink::adapters::log_sink::LogEventSink;
use fieldlink::adapters::restart::DeviceRestart;
use fieldlink::adapters::time::{SystemClock, start_sntp};
use fieldlink::adapters::wifi::WifiAdapter;
use fieldlink::app::service::{AppService, DeviceIo};
use fieldlink::config::DeviceConfig;
use fieldlink::delivery::spawn_workers;
use fieldlink::drivers::status_led::UpdateLed;
use fieldlink::ota::{self, HttpUpdater};

/// Main-loop pacing. The schedule gate decides when real work happens.
const LOOP_SLEEP_MS: u64 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  fieldlink v{:<24} ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1b. OTA rollback check ────────────────────────────────
    ota::mark_running_valid();

    // ── 2. Configuration (baked in from cfg.toml) ─────────────
    let config = DeviceConfig::load()?;
    info!(
        "Config: ssid='{}' endpoints={} interval={}ms workers={}",
        config.identity.ssid,
        config.identity.telemetry_urls.len(),
        config.interval_ms,
        config.delivery_workers
    );

    // ── 3. Peripherals + WiFi driver ──────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs, &config.identity)?;

    // ── 4. Application core + delivery workers ────────────────
    let http = EspHttpAdapter::new(config.http_timeout_ms);
    let mut log_sink = LogEventSink::new();
    let mut app = AppService::new(&config, StdRng::from_entropy());
    spawn_workers(app.pool(), &http, &log_sink)?;

    // ── 5. Blocking join, then wall-clock sync ────────────────
    let mut clock = SystemClock::new();
    app.setup(&mut wifi, &mut clock, &mut log_sink);

    let _sntp = match start_sntp() {
        Ok(sntp) => Some(sntp),
        Err(e) => {
            warn!("SNTP start failed ({:?}), timestamps stay unsynced", e);
            None
        }
    };

    // ── 6. Update paths ───────────────────────────────────────
    let local_ota = LocalOtaListener::bind(config.local_ota_port)?;
    let led = UpdateLed::new(PinDriver::output(peripherals.pins.gpio2)?, PinState::Low);
    let updater = HttpUpdater::new(http.clone(), led);

    let mut io = DeviceIo {
        wifi,
        local_ota,
        clock,
        http,
        updater,
        restart: DeviceRestart,
    };

    info!("Entering main loop");

    // ── 7. Main loop ──────────────────────────────────────────
    loop {
        let report = app.tick(&mut io, &mut log_sink);
        if report.restarted {
            warn!("Restart requested but still running; continuing");
        }
        std::thread::sleep(std::time::Duration::from_millis(LOOP_SLEEP_MS));
    }
}
