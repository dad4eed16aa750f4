//! Application core: pure domain logic, zero I/O.
//!
//! Connection supervision, telemetry dispatch, the two-phase update
//! check, and the main-loop body that interleaves them. All interaction
//! with the network, flash, and clocks happens through **port traits**
//! defined in [`ports`], keeping this layer testable on the host.

pub mod connectivity;
pub mod events;
pub mod ports;
pub mod service;
pub mod telemetry;
pub mod update;
