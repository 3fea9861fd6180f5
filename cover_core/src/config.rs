//! Configuration types for the cover engine.
//!
//! These are the runtime configuration structs used by `SingleControlCover` and
//! the run loop. They are separate from the deserialized config in `cover_config`.

use crate::motion::Direction;

/// Travel and activation timing, all in milliseconds.
#[derive(Debug, Clone)]
pub struct TimingCfg {
    /// Full closed-to-open travel time; also the open timeout.
    pub open_duration_ms: u64,
    /// Full open-to-closed travel time; also the close timeout.
    pub close_duration_ms: u64,
    /// Pulse width / hold time of an activation, and the minimum spacing between two.
    pub activation_interval_ms: u64,
}

impl TimingCfg {
    #[inline]
    pub fn duration_ms(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Open => self.open_duration_ms,
            Direction::Close => self.close_duration_ms,
        }
    }
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            open_duration_ms: 15_000,
            close_duration_ms: 15_000,
            activation_interval_ms: 500,
        }
    }
}

/// Endstop signal conditioning.
#[derive(Debug, Clone)]
pub struct EndstopCfg {
    /// A changed reading must hold this long before it counts (0 = no debounce).
    pub debounce_ms: u64,
}

impl Default for EndstopCfg {
    fn default() -> Self {
        Self { debounce_ms: 50 }
    }
}

/// Reaction to a request for the opposite direction while moving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReversePolicy {
    /// Stop, then reverse once the activation interval has passed.
    #[default]
    StopThenReverse,
    /// Keep moving; the request is logged and dropped.
    Ignore,
}

/// How an `ActuatorDriver` drives its output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorKind {
    /// Drive the active level for the interval, then release.
    Pulse,
    /// Invert the current level for the interval, then restore it.
    Toggle,
}

#[derive(Debug, Clone)]
pub struct ActuatorCfg {
    pub kind: ActuatorKind,
    pub interval_ms: u64,
    /// Only meaningful for `Pulse`: the active level is low.
    pub active_low: bool,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            kind: ActuatorKind::Pulse,
            interval_ms: 500,
            active_low: false,
        }
    }
}
