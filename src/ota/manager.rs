//! Flash session over the inactive OTA slot, backed by the `esp-ota` crate.
//!
//! Flow: begin(size) → N × write(chunk) → finalize → restart
//!
//! The first byte written must be the ESP application image magic; a
//! session that sees anything else is torn down before touching more
//! flash. On simulation targets the image is kept in memory.

use core::fmt;
use log::{info, warn};

/// Largest image accepted. Matches the 4 MB app slots in the partition table.
pub const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024;

/// First byte of every ESP32 application image.
pub const ESP_IMAGE_MAGIC: u8 = 0xE9;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    TooLarge,
    NoPartition,
    BeginFailed,
    BadMagic,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    Overflow,
}

impl OtaError {
    /// Flash-layer error code, numbered like the Arduino `Update` class.
    pub const fn code(self) -> i32 {
        match self {
            Self::WriteFailed => 1,
            Self::BeginFailed => 2,
            Self::TooLarge => 4,
            Self::InvalidSize | Self::Overflow => 5,
            Self::IncompleteTransfer => 6,
            Self::VerifyFailed => 7,
            Self::BadMagic => 8,
            Self::BootSetFailed => 9,
            Self::NoPartition => 10,
            Self::AlreadyInProgress => 11,
            Self::NotReceiving => 12,
        }
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size must be non-zero"),
            Self::TooLarge => write!(f, "firmware larger than OTA slot (max 4 MB)"),
            Self::NoPartition => write!(f, "no inactive OTA partition available"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::BadMagic => write!(f, "image does not start with 0xE9 magic"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "operation requires active Receiving state"),
            Self::Overflow => write!(f, "chunk would exceed declared firmware size"),
        }
    }
}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving {
        expected_size: u32,
        bytes_written: u32,
    },
    ReadyToReboot,
    Failed,
}

// ── Manager ───────────────────────────────────────────────────

/// OTA flash session.
///
/// On ESP-IDF targets, uses the `esp-ota` crate for partition
/// management. On simulation targets, collects the image in memory.
pub struct OtaManager {
    state: OtaState,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
    #[cfg(not(target_os = "espidf"))]
    image: Vec<u8>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            #[cfg(target_os = "espidf")]
            ota_update: None,
            #[cfg(not(target_os = "espidf"))]
            image: Vec::new(),
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Begin a session. `Failed` and `ReadyToReboot` sessions are
    /// discarded; a `Receiving` one must be aborted first.
    pub fn begin(&mut self, firmware_size: u32) -> Result<(), OtaError> {
        if matches!(self.state, OtaState::Receiving { .. }) {
            return Err(OtaError::AlreadyInProgress);
        }
        if firmware_size == 0 {
            return Err(OtaError::InvalidSize);
        }
        if firmware_size > MAX_FIRMWARE_SIZE {
            return Err(OtaError::TooLarge);
        }

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: read-only lookup in the partition table.
            let next = unsafe { esp_idf_sys::esp_ota_get_next_update_partition(core::ptr::null()) };
            if next.is_null() {
                return Err(OtaError::NoPartition);
            }
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }
        #[cfg(not(target_os = "espidf"))]
        self.image.clear();

        self.state = OtaState::Receiving {
            expected_size: firmware_size,
            bytes_written: 0,
        };
        info!("OTA: begin ({} bytes)", firmware_size);
        Ok(())
    }

    /// Append the next chunk. Returns total bytes written.
    ///
    /// Any error other than `NotReceiving` aborts the session.
    pub fn write(&mut self, data: &[u8]) -> Result<u32, OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        if data.is_empty() {
            return Ok(bytes_written);
        }
        if bytes_written == 0 && data[0] != ESP_IMAGE_MAGIC {
            warn!("OTA: bad image magic 0x{:02X}", data[0]);
            self.fail();
            return Err(OtaError::BadMagic);
        }
        if u64::from(bytes_written) + data.len() as u64 > u64::from(expected_size) {
            self.fail();
            return Err(OtaError::Overflow);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.as_mut() else {
                self.fail();
                return Err(OtaError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!("esp-ota write failed: {:?}", e);
                self.fail();
                return Err(OtaError::WriteFailed);
            }
        }
        #[cfg(not(target_os = "espidf"))]
        self.image.extend_from_slice(data);

        let new_written = bytes_written + data.len() as u32;
        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        };
        Ok(new_written)
    }

    /// Verify the image and select it for the next boot.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if bytes_written == expected_size => {}
            OtaState::Receiving { .. } => {
                self.fail();
                return Err(OtaError::IncompleteTransfer);
            }
            _ => return Err(OtaError::NotReceiving),
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.state = OtaState::Failed;
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::BootSetFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("OTA: finalized, ready to reboot");
        Ok(())
    }

    /// Drop the session and return to Idle.
    pub fn abort(&mut self) {
        self.release();
        self.state = OtaState::Idle;
        warn!("OTA: aborted");
    }

    fn fail(&mut self) {
        self.release();
        self.state = OtaState::Failed;
    }

    fn release(&mut self) {
        // esp-ota aborts automatically when OtaUpdate is dropped
        #[cfg(target_os = "espidf")]
        self.ota_update.take();
        #[cfg(not(target_os = "espidf"))]
        self.image.clear();
    }

    /// Bytes collected so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid so the bootloader does not roll back.
#[cfg(target_os = "espidf")]
pub fn mark_running_valid() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn mark_running_valid() {
    info!("OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
