//! Board-level drivers: the update indicator LED and core-pinned tasks.

pub mod status_led;
pub mod task_pin;
