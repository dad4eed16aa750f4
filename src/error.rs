//! Unified error type for the firmware.
//!
//! Each boundary has its own small `Copy` error enum; this one wraps them
//! so bring-up code can use a single `Result`. The steady-state loop
//! never returns errors: they are turned into events where they occur.

use core::fmt;

pub use crate::app::ports::{ConnectivityError, HttpError, UpdateError};
pub use crate::config::ConfigError;
pub use crate::ota::OtaError;
pub use crate::version::VersionError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Connectivity(ConnectivityError),
    Http(HttpError),
    Version(VersionError),
    Ota(OtaError),
    Update(UpdateError),
    Config(ConfigError),
    /// Peripheral or service initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity(e) => write!(f, "wifi: {e}"),
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Version(e) => write!(f, "version: {e}"),
            Self::Ota(e) => write!(f, "ota: {e}"),
            Self::Update(e) => write!(f, "update ({}): {e}", e.code()),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for ConnectivityError {}
impl std::error::Error for HttpError {}
impl std::error::Error for VersionError {}
impl std::error::Error for OtaError {}
impl std::error::Error for UpdateError {}
impl std::error::Error for ConfigError {}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<HttpError> for Error {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

impl From<VersionError> for Error {
    fn from(e: VersionError) -> Self {
        Self::Version(e)
    }
}

impl From<OtaError> for Error {
    fn from(e: OtaError) -> Self {
        Self::Ota(e)
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
