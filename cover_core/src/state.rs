//! Cover state, host-facing snapshot, and events.

use crate::endstop::Endstop;
use crate::motion::Direction;

/// Modelled state of the door. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverState {
    IdleOpen,
    IdleClosed,
    Opening,
    Closing,
    /// Stopped somewhere between the endstops.
    StoppedPartial,
}

impl CoverState {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverState::IdleOpen => "idle_open",
            CoverState::IdleClosed => "idle_closed",
            CoverState::Opening => "opening",
            CoverState::Closing => "closing",
            CoverState::StoppedPartial => "stopped_partial",
        }
    }

    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, CoverState::Opening | CoverState::Closing)
    }

    /// Direction of travel, if moving.
    #[inline]
    pub fn direction(self) -> Option<Direction> {
        match self {
            CoverState::Opening => Some(Direction::Open),
            CoverState::Closing => Some(Direction::Close),
            _ => None,
        }
    }

    pub fn operation(self) -> CoverOperation {
        match self {
            CoverState::Opening => CoverOperation::Opening,
            CoverState::Closing => CoverOperation::Closing,
            _ => CoverOperation::Idle,
        }
    }

    pub(crate) fn moving(direction: Direction) -> Self {
        match direction {
            Direction::Open => CoverState::Opening,
            Direction::Close => CoverState::Closing,
        }
    }

    pub(crate) fn idle_at(direction: Direction) -> Self {
        match direction {
            Direction::Open => CoverState::IdleOpen,
            Direction::Close => CoverState::IdleClosed,
        }
    }
}

impl core::fmt::Display for CoverState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverOperation {
    Idle,
    Opening,
    Closing,
}

impl CoverOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverOperation::Idle => "idle",
            CoverOperation::Opening => "opening",
            CoverOperation::Closing => "closing",
        }
    }
}

/// What the host sees.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverSnapshot {
    pub state: CoverState,
    pub operation: CoverOperation,
    pub position: f32,
    pub target_position: Option<f32>,
    /// Motions that ended by timeout instead of an endstop.
    pub endstop_timeouts: u32,
    pub activations: u64,
}

/// Capability flags reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverTraits {
    pub supports_stop: bool,
    pub supports_position: bool,
    pub supports_toggle: bool,
    pub supports_tilt: bool,
    pub is_assumed_state: bool,
}

impl Default for CoverTraits {
    fn default() -> Self {
        Self {
            supports_stop: true,
            supports_position: true,
            supports_toggle: true,
            supports_tilt: false,
            is_assumed_state: false,
        }
    }
}

/// Notable things that happened during a command or tick. Drained by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverEvent {
    StateChanged { from: CoverState, to: CoverState },
    Activated { at_ms: u64 },
    /// Travel time ran out without the endstop firing.
    EndstopTimeout { direction: Direction },
    /// Endstop fired against the direction of travel; ignored.
    AnomalousEndstop { endstop: Endstop },
    /// The door started moving without us (remote, wall button).
    ExternalMotion { direction: Direction },
}
