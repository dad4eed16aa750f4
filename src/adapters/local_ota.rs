//! LAN push-update listener.
//!
//! Implements [`LocalOtaPort`]. A workstation on the same network pushes
//! an image over plain TCP:
//!
//! ```text
//!  client ──▶ [u32 LE image length][image bytes…]
//!  device ◀── "OK\n"   (image flashed and selected for next boot)
//! ```
//!
//! Everything is non-blocking: each `poll()` accepts at most one client
//! or reads at most one chunk, so the main loop keeps ticking while an
//! upload trickles in. A short, malformed or oversized push aborts the
//! flash session and drops the connection, and so does a client that
//! sends nothing for [`IDLE_TIMEOUT`] while holding the socket open.
//!
//! `std::net` maps onto lwIP sockets on ESP-IDF, so the same code runs on
//! the device and on the host.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::app::ports::{LocalOtaPort, LocalOtaStatus};
use crate::ota::{OtaManager, OtaState};

pub const DEFAULT_PORT: u16 = 3232;

const CHUNK_SIZE: usize = 1024;
const HEADER_LEN: usize = 4;

/// Longest silence tolerated from a connected client.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

struct PushSession {
    stream: TcpStream,
    header: [u8; HEADER_LEN],
    header_len: usize,
    expected: Option<u32>,
    last_progress: Instant,
}

pub struct LocalOtaListener {
    listener: TcpListener,
    session: Option<PushSession>,
    ota: OtaManager,
    buf: Vec<u8>,
    idle_timeout: Duration,
}

impl LocalOtaListener {
    /// Listen on `0.0.0.0:<port>`. Port `0` lets the OS pick (tests).
    pub fn bind(port: u16) -> io::Result<Self> {
        Self::bind_addr(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    pub fn bind_addr(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!("LocalOTA: listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            session: None,
            ota: OtaManager::new(),
            buf: vec![0; CHUNK_SIZE],
            idle_timeout: IDLE_TIMEOUT,
        })
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn try_accept(&mut self) -> LocalOtaStatus {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("LocalOTA: cannot make client socket non-blocking: {}", e);
                    return LocalOtaStatus::Idle;
                }
                info!("LocalOTA: push from {}", peer);
                self.session = Some(PushSession {
                    stream,
                    header: [0; HEADER_LEN],
                    header_len: 0,
                    expected: None,
                    last_progress: Instant::now(),
                });
                LocalOtaStatus::InProgress
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => LocalOtaStatus::Idle,
            Err(e) => {
                warn!("LocalOTA: accept error: {}", e);
                LocalOtaStatus::Idle
            }
        }
    }

    fn service_session(&mut self) -> LocalOtaStatus {
        let Some(session) = self.session.as_mut() else {
            return LocalOtaStatus::Idle;
        };

        let n = match session.stream.read(&mut self.buf) {
            Ok(0) => return self.drop_session("connection closed before image complete"),
            Ok(n) => n,
            Err(ref e)
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                if session.last_progress.elapsed() >= self.idle_timeout {
                    return self.drop_session("idle timeout");
                }
                return LocalOtaStatus::InProgress;
            }
            Err(e) => {
                warn!("LocalOTA: read error: {}", e);
                return self.drop_session("read error");
            }
        };

        session.last_progress = Instant::now();
        let mut data = &self.buf[..n];

        if session.expected.is_none() {
            let take = (HEADER_LEN - session.header_len).min(data.len());
            session.header[session.header_len..session.header_len + take]
                .copy_from_slice(&data[..take]);
            session.header_len += take;
            data = &data[take..];
            if session.header_len < HEADER_LEN {
                return LocalOtaStatus::InProgress;
            }
            let size = u32::from_le_bytes(session.header);
            if let Err(e) = self.ota.begin(size) {
                warn!("LocalOTA: rejected {} byte image: {}", size, e);
                return self.drop_session("begin failed");
            }
            session.expected = Some(size);
        }

        if data.is_empty() {
            return LocalOtaStatus::InProgress;
        }

        let written = match self.ota.write(data) {
            Ok(total) => total,
            Err(e) => {
                warn!("LocalOTA: {}", e);
                return self.drop_session("write failed");
            }
        };

        if Some(written) != session.expected {
            return LocalOtaStatus::InProgress;
        }

        match self.ota.finalize() {
            Ok(()) => {
                if let Err(e) = session.stream.write_all(b"OK\n") {
                    warn!("LocalOTA: could not acknowledge push: {}", e);
                }
                let _ = session.stream.flush();
                self.session = None;
                info!("LocalOTA: image complete ({} bytes)", written);
                LocalOtaStatus::ReadyToRestart
            }
            Err(e) => {
                warn!("LocalOTA: finalize failed: {}", e);
                self.drop_session("finalize failed")
            }
        }
    }

    fn drop_session(&mut self, reason: &str) -> LocalOtaStatus {
        warn!("LocalOTA: push aborted ({})", reason);
        self.session = None;
        if self.ota.state() != OtaState::Idle {
            self.ota.abort();
        }
        LocalOtaStatus::Idle
    }
}

impl LocalOtaPort for LocalOtaListener {
    fn poll(&mut self) -> LocalOtaStatus {
        if self.session.is_some() {
            self.service_session()
        } else {
            self.try_accept()
        }
    }
}
