//! Pull update: GET the firmware image and stream it into the inactive
//! OTA slot.
//!
//! Response handling:
//!
//! | Status | Outcome                                   |
//! |--------|-------------------------------------------|
//! | 200    | flash if Content-Length is present and fits |
//! | 304    | `NoUpdates`                               |
//! | 403    | `Failed(Forbidden)`                       |
//! | 404    | `Failed(FileNotFound)`                    |
//! | other  | `Failed(WrongHttpCode)`                   |
//!
//! The download runs with [`TlsPolicy::Insecure`]; the server chain is
//! not validated.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use super::manager::{OtaError, OtaManager, OtaState, MAX_FIRMWARE_SIZE};
use crate::app::ports::{
    FirmwareUpdatePort, HttpClientPort, HttpError, ResponseSink, TlsPolicy, UpdateError,
    UpdateOutcome,
};
use crate::drivers::status_led::UpdateLed;

/// [`FirmwareUpdatePort`] over an [`HttpClientPort`] and an [`OtaManager`].
pub struct HttpUpdater<H, P> {
    http: H,
    ota: OtaManager,
    led: UpdateLed<P>,
}

impl<H: HttpClientPort, P: OutputPin> HttpUpdater<H, P> {
    pub fn new(http: H, led: UpdateLed<P>) -> Self {
        Self {
            http,
            ota: OtaManager::new(),
            led,
        }
    }

    pub fn ota_state(&self) -> OtaState {
        self.ota.state()
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn led(&self) -> &UpdateLed<P> {
        &self.led
    }

    fn run(&mut self, url: &str) -> UpdateOutcome {
        let mut sink = FlashSink::new(&mut self.ota);
        let result = self.http.get(url, TlsPolicy::Insecure, &mut sink);
        let sink_error = sink.error;

        // A sink-recorded reason is more precise than the transport's view.
        let outcome = match (result, sink_error) {
            (_, Some(reason)) => UpdateOutcome::Failed(reason),
            (Err(e), None) => UpdateOutcome::Failed(UpdateError::Http(e)),
            (Ok(200), None) => match self.ota.finalize() {
                Ok(()) => UpdateOutcome::Updated,
                Err(e) => UpdateOutcome::Failed(UpdateError::Flash(e)),
            },
            (Ok(304), None) => UpdateOutcome::NoUpdates,
            (Ok(403), None) => UpdateOutcome::Failed(UpdateError::Forbidden),
            (Ok(404), None) => UpdateOutcome::Failed(UpdateError::FileNotFound),
            (Ok(status), None) => UpdateOutcome::Failed(UpdateError::WrongHttpCode(status)),
        };

        if matches!(self.ota.state(), OtaState::Receiving { .. }) {
            self.ota.abort();
        }
        outcome
    }
}

impl<H: HttpClientPort, P: OutputPin> FirmwareUpdatePort for HttpUpdater<H, P> {
    fn update(&mut self, url: &str) -> UpdateOutcome {
        self.led.on();
        let outcome = self.run(url);
        self.led.off();
        debug!("OTA: pull update finished: {:?}", outcome);
        outcome
    }
}

// ── Response → flash adapter ──────────────────────────────────

struct FlashSink<'a> {
    ota: &'a mut OtaManager,
    error: Option<UpdateError>,
}

impl<'a> FlashSink<'a> {
    fn new(ota: &'a mut OtaManager) -> Self {
        Self { ota, error: None }
    }
}

impl ResponseSink for FlashSink<'_> {
    fn on_response(&mut self, status: u16, content_length: Option<u64>) -> bool {
        if status != 200 {
            return false;
        }
        let size = match content_length {
            Some(len) if len > u64::from(MAX_FIRMWARE_SIZE) => {
                self.error = Some(UpdateError::TooLessSpace);
                return false;
            }
            Some(len) if len > 0 => len as u32,
            _ => {
                self.error = Some(UpdateError::ServerNotReportSize);
                return false;
            }
        };
        match self.ota.begin(size) {
            Ok(()) => true,
            Err(e) => {
                warn!("OTA: cannot start flash session: {}", e);
                self.error = Some(match e {
                    OtaError::NoPartition => UpdateError::NoPartition,
                    OtaError::TooLarge => UpdateError::TooLessSpace,
                    other => UpdateError::Flash(other),
                });
                false
            }
        }
    }

    fn on_chunk(&mut self, chunk: &[u8]) -> bool {
        match self.ota.write(chunk) {
            Ok(_) => true,
            Err(OtaError::BadMagic) => {
                self.error = Some(UpdateError::BinVerifyHeader);
                false
            }
            Err(e) => {
                self.error = Some(UpdateError::Flash(e));
                false
            }
        }
    }
}
