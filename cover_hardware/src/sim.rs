//! Simulated single-control door opener.
//!
//! Every assertion of the opener input cycles the motor the way a real wall
//! button does: a moving door stops, a stopped door starts in the direction
//! opposite to its last travel. The door stops by itself at either end.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cover_traits::{BinaryState, Clock, OutputLine};
use tracing::debug;

use crate::error::HwError;

/// Physical parameters of the simulated door.
#[derive(Debug, Clone)]
pub struct DoorSpec {
    /// Time for a full closed-to-open travel.
    pub open_travel: Duration,
    /// Time for a full open-to-closed travel.
    pub close_travel: Duration,
    /// Initial position, 0.0 closed .. 1.0 open.
    pub start_position: f32,
    /// Open endstop never reports (wiring fault).
    pub broken_open_endstop: bool,
    /// Close endstop never reports (wiring fault).
    pub broken_close_endstop: bool,
}

impl Default for DoorSpec {
    fn default() -> Self {
        Self {
            open_travel: Duration::from_secs(15),
            close_travel: Duration::from_secs(15),
            start_position: 0.0,
            broken_open_endstop: false,
            broken_close_endstop: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorMotion {
    Stopped,
    Opening,
    Closing,
}

#[derive(Debug)]
struct DoorModel {
    spec: DoorSpec,
    position: f32,
    motion: DoorMotion,
    last_travel: DoorMotion,
    updated_at: Instant,
    presses: u32,
    input_high: bool,
    input_fault: bool,
}

impl DoorModel {
    fn advance(&mut self, now: Instant) {
        let dt = now.saturating_duration_since(self.updated_at).as_secs_f32();
        self.updated_at = now;
        match self.motion {
            DoorMotion::Opening => {
                let travel = self.spec.open_travel.as_secs_f32().max(f32::EPSILON);
                self.position = (self.position + dt / travel).min(1.0);
                if self.position >= 1.0 {
                    self.motion = DoorMotion::Stopped;
                    debug!("sim door reached open limit");
                }
            }
            DoorMotion::Closing => {
                let travel = self.spec.close_travel.as_secs_f32().max(f32::EPSILON);
                self.position = (self.position - dt / travel).max(0.0);
                if self.position <= 0.0 {
                    self.motion = DoorMotion::Stopped;
                    debug!("sim door reached close limit");
                }
            }
            DoorMotion::Stopped => {}
        }
    }

    fn press(&mut self, now: Instant) {
        self.advance(now);
        self.presses = self.presses.saturating_add(1);
        self.motion = match self.motion {
            DoorMotion::Stopped => {
                // Limits win over memory: a door sitting at an end can only go one way.
                let next = if self.position >= 1.0 {
                    DoorMotion::Closing
                } else if self.position <= 0.0 {
                    DoorMotion::Opening
                } else if self.last_travel == DoorMotion::Opening {
                    DoorMotion::Closing
                } else {
                    DoorMotion::Opening
                };
                self.last_travel = next;
                next
            }
            DoorMotion::Opening | DoorMotion::Closing => DoorMotion::Stopped,
        };
        debug!(
            position = self.position,
            motion = ?self.motion,
            presses = self.presses,
            "sim door activated"
        );
    }
}

/// Handle to a simulated door. Clones share the same door.
#[derive(Clone)]
pub struct SimulatedDoor {
    model: Rc<RefCell<DoorModel>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedDoor {
    pub fn new(spec: DoorSpec, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let position = spec.start_position.clamp(0.0, 1.0);
        let last_travel = if position <= 0.0 {
            DoorMotion::Closing
        } else {
            DoorMotion::Opening
        };
        let model = DoorModel {
            spec,
            position,
            motion: DoorMotion::Stopped,
            last_travel,
            updated_at: clock.now(),
            presses: 0,
            input_high: false,
            input_fault: false,
        };
        Self {
            model: Rc::new(RefCell::new(model)),
            clock,
        }
    }

    /// The opener's wall-button input, active high. A rising edge cycles the motor.
    pub fn input_line(&self) -> DoorInput {
        self.input_line_with(false)
    }

    /// The opener input with the given active level. The line starts at its
    /// inactive level, and only a change to the active level cycles the motor.
    pub fn input_line_with(&self, active_low: bool) -> DoorInput {
        self.model.borrow_mut().input_high = active_low;
        DoorInput {
            door: self.clone(),
            active_low,
        }
    }

    pub fn open_endstop(&self) -> DoorEndstop {
        DoorEndstop {
            door: self.clone(),
            at_open: true,
        }
    }

    pub fn close_endstop(&self) -> DoorEndstop {
        DoorEndstop {
            door: self.clone(),
            at_open: false,
        }
    }

    /// A press from somewhere else (handheld remote), bypassing the input line.
    pub fn remote_press(&self) {
        let now = self.clock.now();
        self.model.borrow_mut().press(now);
    }

    /// Make writes to the input line fail, as an unplugged relay board would.
    pub fn set_input_fault(&self, fault: bool) {
        self.model.borrow_mut().input_fault = fault;
    }

    pub fn position(&self) -> f32 {
        let now = self.clock.now();
        let mut m = self.model.borrow_mut();
        m.advance(now);
        m.position
    }

    pub fn motion(&self) -> DoorMotion {
        let now = self.clock.now();
        let mut m = self.model.borrow_mut();
        m.advance(now);
        m.motion
    }

    /// Number of activations the opener has seen.
    pub fn presses(&self) -> u32 {
        self.model.borrow().presses
    }
}

/// Output line feeding the simulated opener input.
pub struct DoorInput {
    door: SimulatedDoor,
    active_low: bool,
}

impl OutputLine for DoorInput {
    fn set_level(&mut self, high: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = self.door.clock.now();
        let mut m = self.door.model.borrow_mut();
        if m.input_fault {
            return Err(Box::new(HwError::Unavailable(
                "opener input not responding".into(),
            )));
        }
        let was_active = m.input_high != self.active_low;
        let active = high != self.active_low;
        m.input_high = high;
        if active && !was_active {
            m.press(now);
        }
        Ok(())
    }

    fn is_set_high(&self) -> bool {
        self.door.model.borrow().input_high
    }
}

/// One of the two limit switches of the simulated door.
pub struct DoorEndstop {
    door: SimulatedDoor,
    at_open: bool,
}

impl BinaryState for DoorEndstop {
    fn is_active(&mut self) -> bool {
        let now = self.door.clock.now();
        let mut m = self.door.model.borrow_mut();
        m.advance(now);
        if self.at_open {
            !m.spec.broken_open_endstop && m.position >= 1.0
        } else {
            !m.spec.broken_close_endstop && m.position <= 0.0
        }
    }
}
