//! Device backends for the single-control cover.
//!
//! - `sim`: a physics model of a single-control door opener, exposing its input
//!   line and both endstops through the `cover_traits` capabilities.
//! - `gpio` (feature `hardware`, Linux only): relay outputs and endstop inputs on
//!   Raspberry Pi GPIO via `rppal`.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

pub use error::HwError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioEndstop, GpioLine};
pub use sim::{DoorEndstop, DoorInput, DoorMotion, DoorSpec, SimulatedDoor};
