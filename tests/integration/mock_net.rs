//! Mock adapters for integration tests.
//!
//! Every mock records what the application asked of it so tests can
//! assert on the full call history without a radio, flash, or server.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, OutputPin};
use fieldlink::app::events::AppEvent;
use fieldlink::app::ports::{
    ClockPort, ConnectivityError, ConnectivityPort, DelayPort, EventSink, HttpClientPort,
    HttpError, LocalOtaPort, LocalOtaStatus, ResponseSink, RestartPort, TlsPolicy,
};
use fieldlink::config::{DeviceConfig, DeviceIdentity, Secret};

pub const TELEMETRY_A: &str = "https://collector-a.example/api/data";
pub const TELEMETRY_B: &str = "https://collector-b.example/api/data";
pub const VERSION_URL: &str = "https://updates.example/version.txt";
pub const FIRMWARE_URL: &str = "https://updates.example/firmware.bin";

pub fn test_config() -> DeviceConfig {
    DeviceConfig {
        identity: DeviceIdentity {
            ssid: "campus-secure".into(),
            eap_identity: "node-17@example.edu".into(),
            eap_secret: Secret::new("correct horse"),
            telemetry_urls: vec![TELEMETRY_A.into(), TELEMETRY_B.into()],
            version_url: VERSION_URL.into(),
            firmware_url: FIRMWARE_URL.into(),
        },
        interval_ms: 60_000,
        connect_attempts: 5,
        delivery_workers: 2,
        http_timeout_ms: 10_000,
        local_ota_port: 0,
    }
}

// ── Event recording ───────────────────────────────────────────

/// Shared so worker threads and the test see the same history.
#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<AppEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Wait (bounded) until `pred` matches `n` events.
    pub fn wait_for(&self, n: usize, pred: impl Fn(&AppEvent) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if self.count(&pred) >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

// ── Connectivity ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockWifi {
    pub link: bool,
    /// `begin_join` brings the link up immediately.
    pub join_succeeds: bool,
    /// Fail `begin_join` outright.
    pub reject: bool,
    /// `rejoin` brings the link back.
    pub rejoin_succeeds: bool,
    pub joins: u32,
    pub rejoins: u32,
}

#[allow(dead_code)]
impl MockWifi {
    pub fn online() -> Self {
        Self {
            join_succeeds: true,
            ..Self::default()
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }
}

impl ConnectivityPort for MockWifi {
    fn begin_join(&mut self) -> Result<(), ConnectivityError> {
        self.joins += 1;
        if self.reject {
            return Err(ConnectivityError::InvalidCredentials);
        }
        self.link = self.join_succeeds;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link
    }

    fn rejoin(&mut self) {
        self.rejoins += 1;
        if self.rejoin_succeeds {
            self.link = true;
        }
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.link.then_some(Ipv4Addr::new(10, 0, 0, 42))
    }
}

// ── Clocks ────────────────────────────────────────────────────

pub struct MockClock {
    now_ms: Cell<u64>,
    pub unix: Option<u64>,
}

#[allow(dead_code)]
impl MockClock {
    /// Monotonic at zero, wall clock synced to 2024-03-01T12:34:56Z.
    pub fn synced() -> Self {
        Self {
            now_ms: Cell::new(0),
            unix: Some(1_709_296_496),
        }
    }

    pub fn unsynced() -> Self {
        Self {
            now_ms: Cell::new(0),
            unix: None,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl ClockPort for MockClock {
    fn monotonic_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn unix_time_secs(&self) -> Option<u64> {
        self.unix
    }
}

#[derive(Debug, Default)]
pub struct CountingDelay {
    pub calls: u32,
    pub total_ms: u64,
}

impl DelayPort for CountingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.total_ms += u64::from(ms);
    }
}

// ── HTTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    /// Status line only, no body offered.
    Status(u16),
    Body {
        status: u16,
        content_length: Option<u64>,
        body: Vec<u8>,
    },
    Fail(HttpError),
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Self::Body {
            status: 200,
            content_length: Some(body.len() as u64),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn image(body: Vec<u8>) -> Self {
        Self::Body {
            status: 200,
            content_length: Some(body.len() as u64),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub url: String,
    pub tls: TlsPolicy,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Default)]
struct HttpState {
    routes: HashMap<String, Reply>,
    post_reply: Option<Result<u16, HttpError>>,
    posts: Vec<PostRecord>,
    gets: Vec<(String, TlsPolicy)>,
}

/// Scripted server shared by every clone (main loop, updater, workers).
#[derive(Clone, Default)]
pub struct MockHttp(Arc<Mutex<HttpState>>);

#[allow(dead_code)]
impl MockHttp {
    pub fn route(&self, url: &str, reply: Reply) {
        self.0.lock().unwrap().routes.insert(url.to_owned(), reply);
    }

    /// Reply every POST gets (default 200).
    pub fn post_reply(&self, reply: Result<u16, HttpError>) {
        self.0.lock().unwrap().post_reply = Some(reply);
    }

    pub fn posts(&self) -> Vec<PostRecord> {
        self.0.lock().unwrap().posts.clone()
    }

    pub fn gets(&self) -> Vec<(String, TlsPolicy)> {
        self.0.lock().unwrap().gets.clone()
    }

    pub fn gets_to(&self, url: &str) -> usize {
        self.gets().iter().filter(|(u, _)| u == url).count()
    }
}

impl HttpClientPort for MockHttp {
    fn post(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, HttpError> {
        let mut state = self.0.lock().unwrap();
        state.posts.push(PostRecord {
            url: url.to_owned(),
            tls,
            content_type: headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
                .map(|(_, v)| (*v).to_owned()),
            body: String::from_utf8_lossy(body).into_owned(),
        });
        state.post_reply.unwrap_or(Ok(200))
    }

    fn get(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        sink: &mut dyn ResponseSink,
    ) -> Result<u16, HttpError> {
        let reply = {
            let mut state = self.0.lock().unwrap();
            state.gets.push((url.to_owned(), tls));
            state.routes.get(url).cloned().unwrap_or(Reply::Status(404))
        };
        match reply {
            Reply::Fail(e) => Err(e),
            Reply::Status(status) => {
                sink.on_response(status, None);
                Ok(status)
            }
            Reply::Body {
                status,
                content_length,
                body,
            } => {
                if sink.on_response(status, content_length) {
                    for chunk in body.chunks(512) {
                        if !sink.on_chunk(chunk) {
                            return Err(HttpError::Aborted);
                        }
                    }
                }
                Ok(status)
            }
        }
    }
}

// ── Local OTA, restart, LED pin ───────────────────────────────

/// Plays back a fixed sequence of statuses, then stays idle.
#[derive(Debug, Default)]
pub struct ScriptedLocalOta {
    pub script: VecDeque<LocalOtaStatus>,
    pub polls: u32,
}

impl LocalOtaPort for ScriptedLocalOta {
    fn poll(&mut self) -> LocalOtaStatus {
        self.polls += 1;
        self.script.pop_front().unwrap_or(LocalOtaStatus::Idle)
    }
}

#[derive(Debug, Default)]
pub struct CountingRestart {
    pub count: u32,
}

impl RestartPort for CountingRestart {
    fn restart(&mut self) {
        self.count += 1;
    }
}

/// Records every level written.
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub writes: Vec<bool>,
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.writes.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.writes.push(true);
        Ok(())
    }
}

/// Minimal valid-looking ESP application image.
#[allow(dead_code)]
pub fn firmware_image(len: usize) -> Vec<u8> {
    let mut image: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    image[0] = fieldlink::ota::manager::ESP_IMAGE_MAGIC;
    image
}
