//! Port traits: the hexagonal boundary between the scheduling core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (WiFi, HTTP, flash, clocks, the local OTA listener,
//! event sinks) implement these traits. The [`AppService`](super::service::AppService)
//! consumes them via generics, so the core never touches the network or
//! the flash directly and runs unchanged against mocks on the host.
//!
//! ## Trust notes
//!
//! - Version checks and firmware downloads use [`TlsPolicy::Insecure`]:
//!   the channel is encrypted but the server chain is not validated.
//! - Telemetry uses [`TlsPolicy::Verified`].

use core::fmt;
use std::net::Ipv4Addr;

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: domain ↔ WiFi station)
// ───────────────────────────────────────────────────────────────

/// Station-mode WiFi session with enterprise credentials.
pub trait ConnectivityPort {
    /// Configure credentials and start a join. Returns once the request
    /// is issued; completion is observed through [`is_connected`](Self::is_connected).
    fn begin_join(&mut self) -> Result<(), ConnectivityError>;

    /// Pure status query. Connected means associated with an IP lease.
    fn is_connected(&self) -> bool;

    /// Re-issue a join request without waiting for it. Errors are the
    /// transport's business; the next tick asks again.
    fn rejoin(&mut self);

    /// Station address when connected.
    fn ip_address(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// HTTP client port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// How an HTTPS connection treats the server certificate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Validate against the bundled CA set.
    Verified,
    /// Encrypt without validating the chain (known trust gap).
    Insecure,
}

/// Receives a streamed response body.
pub trait ResponseSink {
    /// Called once after the headers arrive. Return `false` to skip the
    /// body entirely.
    fn on_response(&mut self, status: u16, content_length: Option<u64>) -> bool;

    /// Called for every body chunk, in order. Return `false` to abort the
    /// transfer; the client then returns [`HttpError::Aborted`].
    fn on_chunk(&mut self, chunk: &[u8]) -> bool;
}

/// Blocking request/response client. One connection per call.
pub trait HttpClientPort {
    /// POST `body` and return the response status. The body is not read.
    fn post(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, HttpError>;

    /// GET `url`, streaming the body into `sink`. Returns the status.
    fn get(
        &mut self,
        url: &str,
        tls: TlsPolicy,
        sink: &mut dyn ResponseSink,
    ) -> Result<u16, HttpError>;
}

/// [`ResponseSink`] that keeps up to `limit` bytes of a text body.
#[derive(Debug, Clone)]
pub struct TextBody {
    pub status: Option<u16>,
    pub body: Vec<u8>,
    pub truncated: bool,
    limit: usize,
}

impl TextBody {
    pub fn new(limit: usize) -> Self {
        Self {
            status: None,
            body: Vec::new(),
            truncated: false,
            limit,
        }
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for TextBody {
    fn on_response(&mut self, status: u16, _content_length: Option<u64>) -> bool {
        self.status = Some(status);
        status == 200
    }

    fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        let room = self.limit.saturating_sub(self.body.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        true
    }
}

// ───────────────────────────────────────────────────────────────
// Firmware update port (driven adapter: domain → OTA mechanism)
// ───────────────────────────────────────────────────────────────

/// Terminal result of one pull-update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Network or flash failure. The running image is untouched.
    Failed(UpdateError),
    /// Server had nothing to apply.
    NoUpdates,
    /// New image flashed and selected for next boot.
    Updated,
}

/// Fetches a firmware image and writes it to the inactive slot.
pub trait FirmwareUpdatePort {
    fn update(&mut self, url: &str) -> UpdateOutcome;
}

// ───────────────────────────────────────────────────────────────
// Local OTA listener port
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalOtaStatus {
    Idle,
    InProgress,
    /// A pushed image was flashed; the device should restart.
    ReadyToRestart,
}

/// LAN push-update service. Must be polled every tick and never block.
pub trait LocalOtaPort {
    fn poll(&mut self) -> LocalOtaStatus;
}

// ───────────────────────────────────────────────────────────────
// Restart / time ports
// ───────────────────────────────────────────────────────────────

pub trait RestartPort {
    /// Reset the chip. On hardware this does not return.
    fn restart(&mut self);
}

pub trait ClockPort {
    /// Milliseconds since boot. Never goes backwards.
    fn monotonic_ms(&self) -> u64;

    /// Seconds since the Unix epoch, if the RTC can be read at all.
    /// Before SNTP sync this is usually a small number near 1970.
    fn unix_time_secs(&self) -> Option<u64>;
}

pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConnectivityPort::begin_join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// SSID or enterprise credentials rejected by the driver.
    InvalidCredentials,
    /// Driver configuration or start failed.
    DriverFailed,
    /// Join request could not be issued.
    JoinFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "credentials rejected by driver"),
            Self::DriverFailed => write!(f, "WiFi driver failed"),
            Self::JoinFailed => write!(f, "join request failed"),
        }
    }
}

/// Transport-level HTTP failures. A received status, even 5xx, is not
/// an `HttpError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// TCP/TLS connection could not be established (includes DNS).
    ConnectionFailed,
    /// Request headers or body could not be written.
    SendFailed,
    /// Connection dropped while reading the response.
    ConnectionLost,
    /// No data within the client timeout.
    ReadTimeout,
    /// The response sink asked to stop.
    Aborted,
}

impl HttpError {
    /// Stable negative code, same numbering as the ESP32 Arduino HTTP
    /// client so existing dashboards keep parsing the logs.
    pub const fn code(self) -> i32 {
        match self {
            Self::ConnectionFailed => -1,
            Self::SendFailed => -3,
            Self::ConnectionLost => -5,
            Self::Aborted => -10,
            Self::ReadTimeout => -11,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::SendFailed => write!(f, "send failed"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::ReadTimeout => write!(f, "read timeout"),
            Self::Aborted => write!(f, "transfer aborted by receiver"),
        }
    }
}

/// Why a pull update failed. [`code`](Self::code) is what gets logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// Image larger than the OTA slot.
    TooLessSpace,
    /// Server sent no Content-Length.
    ServerNotReportSize,
    /// 404.
    FileNotFound,
    /// 403.
    Forbidden,
    /// Any other unexpected status.
    WrongHttpCode(u16),
    /// First byte is not the ESP image magic.
    BinVerifyHeader,
    /// No inactive OTA partition to write to.
    NoPartition,
    /// Transport failed before or during the download.
    Http(HttpError),
    /// Flash session rejected the image.
    Flash(crate::ota::OtaError),
}

impl UpdateError {
    pub const fn code(self) -> i32 {
        match self {
            Self::TooLessSpace => -100,
            Self::ServerNotReportSize => -101,
            Self::FileNotFound => -102,
            Self::Forbidden => -103,
            Self::WrongHttpCode(_) => -104,
            Self::BinVerifyHeader => -106,
            Self::NoPartition => -108,
            Self::Http(e) => e.code(),
            Self::Flash(e) => e.code(),
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLessSpace => write!(f, "Not Enough space"),
            Self::ServerNotReportSize => write!(f, "Server Did Not Report Size"),
            Self::FileNotFound => write!(f, "File Not Found (404)"),
            Self::Forbidden => write!(f, "Forbidden (403)"),
            Self::WrongHttpCode(status) => write!(f, "Wrong HTTP Code ({status})"),
            Self::BinVerifyHeader => write!(f, "Verify Bin Header Failed"),
            Self::NoPartition => write!(f, "Partition Could Not be Found"),
            Self::Http(e) => write!(f, "{e}"),
            Self::Flash(e) => write!(f, "{e}"),
        }
    }
}
