//! Chip reset adapter.

use log::info;

use crate::app::ports::RestartPort;

#[derive(Debug, Default)]
pub struct DeviceRestart;

impl RestartPort for DeviceRestart {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("Restart: rebooting into selected image");
        esp_ota::restart();
    }

    /// Simulation: records nothing and returns.
    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("Restart (simulation): no hardware reset");
    }
}
