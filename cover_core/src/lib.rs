#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Single-control cover engine (hardware-agnostic).
//!
//! A garage door or gate driven by one button (or switch) and watched by two
//! endstops. Every activation cycles the opener, so the engine tracks the last
//! direction of travel and works out how many activations a request needs.
//! All hardware goes through the `cover_traits` capabilities.
//!
//! ## Architecture
//!
//! - **Endstop Monitor**: debounced edges from both limit sensors (`endstop`)
//! - **Actuator Driver**: pulse or toggle an output line (`actuator`)
//! - **Motion Timer**: position from elapsed travel time (`motion`)
//! - **State Machine**: `SingleControlCover` (`cover`)
//! - **Run loop**: commands, ticks, publishing (`runner`)

pub mod actuator;
pub mod builder;
pub mod command;
pub mod config;
pub mod conversions;
pub mod cover;
pub mod endstop;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod runner;
pub mod state;
pub mod util;

pub use actuator::ActuatorDriver;
pub use builder::{CoverBuilder, Missing, Set};
pub use command::{CoverCommand, Script};
pub use config::{ActuatorCfg, ActuatorKind, EndstopCfg, ReversePolicy, TimingCfg};
pub use cover::SingleControlCover;
pub use endstop::{Debouncer, Edge, Endstop, EndstopEvent, EndstopMonitor};
pub use error::{BuildError, CoverError, Report, Result};
pub use motion::{Direction, MotionOperation, interpolate};
pub use runner::{CommandSource, RunParams, RunSummary, run};
pub use state::{CoverEvent, CoverOperation, CoverSnapshot, CoverState, CoverTraits};
