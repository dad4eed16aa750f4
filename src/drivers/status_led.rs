//! Update-activity LED.
//!
//! One GPIO lit while a firmware image is being pulled. Most dev boards
//! wire the built-in LED on GPIO2; the active level is configurable
//! because some boards sink it.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal::digital::OutputPin`: on ESP-IDF the pin is
//! an `esp_idf_hal::gpio::PinDriver`, on host/test any mock pin works.

use embedded_hal::digital::{OutputPin, PinState};

pub struct UpdateLed<P> {
    pin: P,
    active: PinState,
    lit: bool,
}

impl<P: OutputPin> UpdateLed<P> {
    /// Wrap `pin` and drive it to the inactive level.
    pub fn new(pin: P, active: PinState) -> Self {
        let mut led = Self {
            pin,
            active,
            lit: true,
        };
        led.off();
        led
    }

    pub fn on(&mut self) {
        self.drive(true);
    }

    pub fn off(&mut self) {
        self.drive(false);
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn drive(&mut self, lit: bool) {
        if self.lit == lit {
            return;
        }
        let level = if lit { self.active } else { !self.active };
        // A failed GPIO write only costs the indicator.
        if self.pin.set_state(level).is_err() {
            log::warn!("Update LED: GPIO write failed");
        }
        self.lit = lit;
    }
}
