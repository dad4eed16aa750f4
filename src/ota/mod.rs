//! Firmware replacement: the flash session and the pull-update mechanism.

pub mod http_update;
pub mod manager;

pub use http_update::HttpUpdater;
pub use manager::{mark_running_valid, OtaError, OtaManager, OtaState};
