//! The single-control cover state machine.
//!
//! One activation cycles the opener: a moving door stops, a stopped door starts
//! in the direction opposite to its last travel. Host goals that need more than
//! one activation (reversing, opening a door that last went up) are kept as an
//! intent and advanced by `tick`, never faster than the activation interval.

use cover_traits::Activatable;
use eyre::WrapErr;

use crate::command::CoverCommand;
use crate::config::{ReversePolicy, TimingCfg};
use crate::endstop::{Edge, Endstop, EndstopEvent, EndstopMonitor};
use crate::error::{CoverError, Result};
use crate::hw_error::map_hw_error;
use crate::motion::{Direction, MotionOperation};
use crate::state::{CoverEvent, CoverSnapshot, CoverState, CoverTraits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Move(Direction),
    Stop,
}

pub struct SingleControlCover {
    activator: Box<dyn Activatable>,
    endstops: EndstopMonitor,
    timing: TimingCfg,
    policy: ReversePolicy,

    state: CoverState,
    position: f32,
    last_direction: Direction,
    motion: Option<MotionOperation>,

    intent: Option<Intent>,
    target_position: Option<f32>,
    toggle_pending: bool,
    last_activation_ms: Option<u64>,

    activations: u64,
    endstop_timeouts: u32,
    events: Vec<CoverEvent>,
}

impl core::fmt::Debug for SingleControlCover {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SingleControlCover")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("last_direction", &self.last_direction)
            .field("intent", &self.intent)
            .field("target_position", &self.target_position)
            .field("endstops", &self.endstops)
            .finish()
    }
}

impl SingleControlCover {
    pub(crate) fn from_parts(
        activator: Box<dyn Activatable>,
        endstops: EndstopMonitor,
        timing: TimingCfg,
        policy: ReversePolicy,
    ) -> Self {
        Self {
            activator,
            endstops,
            timing,
            policy,
            state: CoverState::StoppedPartial,
            position: 0.5,
            last_direction: Direction::Open,
            motion: None,
            intent: None,
            target_position: None,
            toggle_pending: false,
            last_activation_ms: None,
            activations: 0,
            endstop_timeouts: 0,
            events: Vec::new(),
        }
    }

    // ── Host commands ────────────────────────────────────────────────────────

    pub fn open(&mut self, now_ms: u64) -> Result<()> {
        self.request_move(Direction::Open, Direction::Open.extreme(), now_ms)
    }

    pub fn close(&mut self, now_ms: u64) -> Result<()> {
        self.request_move(Direction::Close, Direction::Close.extreme(), now_ms)
    }

    /// Stop a moving door. Accepted in any state; a no-op when already still.
    pub fn stop(&mut self, now_ms: u64) -> Result<()> {
        self.update_position(now_ms);
        self.toggle_pending = false;
        self.target_position = None;
        if !self.state.is_moving() {
            // Also cancels a reversal waiting for its second activation
            self.intent = None;
            return Ok(());
        }
        self.intent = Some(Intent::Stop);
        self.drive(now_ms)
    }

    /// One activation, whatever the current state.
    pub fn toggle(&mut self, now_ms: u64) -> Result<()> {
        self.update_position(now_ms);
        self.intent = None;
        self.toggle_pending = true;
        self.run_toggle(now_ms)
    }

    /// Move towards `target` and stop there. The ends delegate to open/close,
    /// which leave the final stop to the endstop.
    pub fn set_position(&mut self, target: f32, now_ms: u64) -> Result<()> {
        if !target.is_finite() {
            return Err(eyre::Report::new(CoverError::InvalidCommand(format!(
                "position must be a number in [0, 1], got {target}"
            ))));
        }
        let target = target.clamp(0.0, 1.0);
        if target >= 1.0 {
            return self.open(now_ms);
        }
        if target <= 0.0 {
            return self.close(now_ms);
        }
        self.update_position(now_ms);
        if !self.state.is_moving() && (target - self.position).abs() < f32::EPSILON {
            self.target_position = Some(target);
            return Ok(());
        }
        let direction = if target > self.position {
            Direction::Open
        } else {
            Direction::Close
        };
        self.request_move(direction, target, now_ms)
    }

    pub fn apply(&mut self, command: CoverCommand, now_ms: u64) -> Result<()> {
        tracing::debug!(command = %command, now_ms, "command received");
        match command {
            CoverCommand::Open => self.open(now_ms),
            CoverCommand::Close => self.close(now_ms),
            CoverCommand::Stop => self.stop(now_ms),
            CoverCommand::Toggle => self.toggle(now_ms),
            CoverCommand::Position(p) => self.set_position(p, now_ms),
        }
    }

    // ── Endstop edges ────────────────────────────────────────────────────────

    /// Debounced rising edge of the open endstop.
    ///
    /// `tick` delivers these from the owned monitor; hosts with their own
    /// edge callbacks may call this directly instead.
    pub fn on_endstop_open_triggered(&mut self, now_ms: u64) {
        self.reach_limit(Endstop::Open, now_ms);
    }

    pub fn on_endstop_close_triggered(&mut self, now_ms: u64) {
        self.reach_limit(Endstop::Close, now_ms);
    }

    /// Debounced falling edge of the open endstop.
    pub fn on_endstop_open_released(&mut self, now_ms: u64) {
        self.leave_limit(Endstop::Open, now_ms);
    }

    pub fn on_endstop_close_released(&mut self, now_ms: u64) {
        self.leave_limit(Endstop::Close, now_ms);
    }

    // ── Periodic work ────────────────────────────────────────────────────────

    /// One iteration: release a due activation, take endstop edges, advance the
    /// position estimate, then work towards any pending goal.
    pub fn tick(&mut self, now_ms: u64) -> Result<()> {
        self.activator
            .service()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("release activation output")?;

        for event in self.endstops.poll(now_ms).into_iter().flatten() {
            self.on_endstop_event(event);
        }

        self.update_position(now_ms);
        self.check_timeout(now_ms);
        self.check_target();

        if self.toggle_pending {
            self.run_toggle(now_ms)?;
        }
        self.drive(now_ms)
    }

    /// Derive state and position from the endstops alone.
    ///
    /// Neither endstop active, or both (a wiring fault), leaves the door
    /// `StoppedPartial` at 0.5.
    pub fn sync_from_endstops(&mut self) {
        let (open, close) = self.endstops.prime();
        self.motion = None;
        let state = match (open, close) {
            (true, false) => {
                self.position = 1.0;
                self.last_direction = Direction::Open;
                CoverState::IdleOpen
            }
            (false, true) => {
                self.position = 0.0;
                self.last_direction = Direction::Close;
                CoverState::IdleClosed
            }
            (true, true) => {
                tracing::warn!("both endstops active; assuming door is partially open");
                self.position = 0.5;
                CoverState::StoppedPartial
            }
            (false, false) => {
                self.position = 0.5;
                CoverState::StoppedPartial
            }
        };
        self.target_position = Some(self.position);
        self.set_state(state);
        tracing::info!(
            state = %self.state,
            position = self.position,
            open_endstop = open,
            close_endstop = close,
            "cover state synced from endstops"
        );
    }

    /// Repeat the endstop sync, unless the door is moving or a goal is pending.
    /// Returns whether the sync ran.
    pub fn resync(&mut self) -> bool {
        if self.state.is_moving() || self.has_pending() {
            tracing::debug!(state = %self.state, "resync skipped while busy");
            return false;
        }
        self.sync_from_endstops();
        true
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub fn state(&self) -> CoverState {
        self.state
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn target_position(&self) -> Option<f32> {
        self.target_position
    }

    pub fn motion(&self) -> Option<&MotionOperation> {
        self.motion.as_ref()
    }

    pub fn is_moving(&self) -> bool {
        self.state.is_moving()
    }

    /// A goal still needs activations that were not allowed yet.
    pub fn has_pending(&self) -> bool {
        self.intent.is_some() || self.toggle_pending
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn endstop_timeouts(&self) -> u32 {
        self.endstop_timeouts
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    pub fn snapshot(&self) -> CoverSnapshot {
        CoverSnapshot {
            state: self.state,
            operation: self.state.operation(),
            position: self.position,
            target_position: self.target_position,
            endstop_timeouts: self.endstop_timeouts,
            activations: self.activations,
        }
    }

    pub fn traits(&self) -> CoverTraits {
        CoverTraits::default()
    }

    /// Events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<CoverEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn log_config(&self, name: &str) {
        tracing::info!(
            name,
            open_duration_ms = self.timing.open_duration_ms,
            close_duration_ms = self.timing.close_duration_ms,
            activation_interval_ms = self.timing.activation_interval_ms,
            endstop_debounce_ms = self.endstops.debounce_ms(),
            reverse_policy = ?self.policy,
            "single control cover configured"
        );
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn request_move(&mut self, direction: Direction, target: f32, now_ms: u64) -> Result<()> {
        self.update_position(now_ms);
        self.toggle_pending = false;

        if self.state == CoverState::moving(direction) {
            // Keep the running operation; its start time must not restart
            self.intent = None;
            self.target_position = Some(target);
            return Ok(());
        }
        if self.state == CoverState::moving(direction.reversed())
            && self.policy == ReversePolicy::Ignore
        {
            tracing::warn!(
                state = %self.state,
                requested = direction.as_str(),
                "reverse request ignored while moving"
            );
            return Ok(());
        }
        self.target_position = Some(target);
        if self.state == CoverState::idle_at(direction) {
            self.intent = None;
            return Ok(());
        }
        self.intent = Some(Intent::Move(direction));
        self.drive(now_ms)
    }

    fn intent_satisfied(&self, intent: Intent) -> bool {
        match intent {
            Intent::Move(d) => {
                self.state == CoverState::moving(d) || self.state == CoverState::idle_at(d)
            }
            Intent::Stop => !self.state.is_moving(),
        }
    }

    /// Advance the pending intent by at most one activation.
    fn drive(&mut self, now_ms: u64) -> Result<()> {
        let Some(intent) = self.intent else {
            return Ok(());
        };
        if self.intent_satisfied(intent) {
            self.intent = None;
            return Ok(());
        }
        if self.press(now_ms)? && self.intent_satisfied(intent) {
            self.intent = None;
        }
        Ok(())
    }

    fn run_toggle(&mut self, now_ms: u64) -> Result<()> {
        if !self.press(now_ms)? {
            return Ok(());
        }
        self.toggle_pending = false;
        self.target_position = match self.state {
            CoverState::Opening => Some(1.0),
            CoverState::Closing => Some(0.0),
            _ => Some(self.position),
        };
        Ok(())
    }

    #[inline]
    fn activation_allowed(&self, now_ms: u64) -> bool {
        self.last_activation_ms
            .is_none_or(|t| now_ms.saturating_sub(t) > self.timing.activation_interval_ms)
    }

    /// Activate the opener once, if the spacing allows, and model its reaction.
    ///
    /// A device failure leaves the modelled state untouched, drops pending
    /// goals, and is returned as a `DeviceFault`.
    fn press(&mut self, now_ms: u64) -> Result<bool> {
        if !self.activation_allowed(now_ms) {
            return Ok(false);
        }
        let fired = self
            .activator
            .service()
            .and_then(|()| self.activator.activate());
        if let Err(e) = fired {
            self.intent = None;
            self.toggle_pending = false;
            tracing::warn!(error = %e, state = %self.state, "activation failed");
            return Err(eyre::Report::new(map_hw_error(&*e)).wrap_err("activate door"));
        }

        self.last_activation_ms = Some(now_ms);
        self.activations = self.activations.saturating_add(1);
        self.events.push(CoverEvent::Activated { at_ms: now_ms });

        if self.state.is_moving() {
            self.update_position(now_ms);
            self.motion = None;
            self.set_state(CoverState::StoppedPartial);
        } else {
            self.begin_motion(self.last_direction.reversed(), self.position, now_ms);
        }
        tracing::debug!(
            now_ms,
            state = %self.state,
            position = self.position,
            activations = self.activations,
            "door activated"
        );
        Ok(true)
    }

    fn begin_motion(&mut self, direction: Direction, from: f32, now_ms: u64) {
        self.motion = Some(MotionOperation {
            direction,
            start_ms: now_ms,
            start_position: from,
        });
        self.position = from;
        self.last_direction = direction;
        self.set_state(CoverState::moving(direction));
    }

    fn update_position(&mut self, now_ms: u64) {
        if let Some(op) = self.motion {
            self.position = op.position_at(now_ms, self.timing.duration_ms(op.direction));
        }
    }

    fn check_timeout(&mut self, now_ms: u64) {
        let Some(op) = self.motion else {
            return;
        };
        let duration = self.timing.duration_ms(op.direction);
        if !op.timed_out(now_ms, duration) {
            return;
        }
        self.motion = None;
        self.position = op.direction.extreme();
        self.endstop_timeouts = self.endstop_timeouts.saturating_add(1);
        tracing::warn!(
            direction = op.direction.as_str(),
            duration_ms = duration,
            timeouts = self.endstop_timeouts,
            "endstop did not trigger within travel time; assuming limit reached (endstop degraded?)"
        );
        self.events.push(CoverEvent::EndstopTimeout {
            direction: op.direction,
        });
        self.set_state(CoverState::idle_at(op.direction));
    }

    /// Stop at a partial target once the estimate passes it.
    fn check_target(&mut self) {
        if self.has_pending() {
            return;
        }
        let Some(target) = self.target_position else {
            return;
        };
        if target <= 0.0 || target >= 1.0 {
            return;
        }
        let reached = match self.state.direction() {
            Some(Direction::Open) => self.position >= target,
            Some(Direction::Close) => self.position <= target,
            None => false,
        };
        if reached {
            tracing::debug!(target, position = self.position, "target position reached");
            self.intent = Some(Intent::Stop);
        }
    }

    fn on_endstop_event(&mut self, event: EndstopEvent) {
        tracing::debug!(
            endstop = event.endstop.as_str(),
            edge = ?event.edge,
            at_ms = event.at_ms,
            "endstop edge"
        );
        match event.edge {
            Edge::Rising => self.reach_limit(event.endstop, event.at_ms),
            Edge::Falling => self.leave_limit(event.endstop, event.at_ms),
        }
    }

    fn reach_limit(&mut self, endstop: Endstop, now_ms: u64) {
        let direction = limit_direction(endstop);
        if self.state == CoverState::moving(direction.reversed()) {
            tracing::warn!(
                endstop = endstop.as_str(),
                state = %self.state,
                position = self.position,
                "endstop triggered against direction of travel; ignored"
            );
            self.events.push(CoverEvent::AnomalousEndstop { endstop });
            return;
        }
        self.motion = None;
        self.position = direction.extreme();
        self.last_direction = direction;
        // The opener just stopped by itself; space the next activation from here
        self.last_activation_ms = Some(now_ms);
        self.set_state(CoverState::idle_at(direction));
        if let Some(intent) = self.intent
            && self.intent_satisfied(intent)
        {
            self.intent = None;
        }
    }

    fn leave_limit(&mut self, endstop: Endstop, now_ms: u64) {
        let away = limit_direction(endstop).reversed();
        if self.state == CoverState::moving(away) {
            return;
        }
        tracing::info!(
            endstop = endstop.as_str(),
            direction = away.as_str(),
            "door left endstop without a command; following external motion"
        );
        self.last_activation_ms = Some(now_ms);
        self.target_position = Some(away.extreme());
        self.events.push(CoverEvent::ExternalMotion { direction: away });
        self.begin_motion(away, away.reversed().extreme(), now_ms);
    }

    fn set_state(&mut self, to: CoverState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        tracing::info!(from = %from, to = %to, position = self.position, "cover state changed");
        self.events.push(CoverEvent::StateChanged { from, to });
    }
}

#[inline]
fn limit_direction(endstop: Endstop) -> Direction {
    match endstop {
        Endstop::Open => Direction::Open,
        Endstop::Close => Direction::Close,
    }
}
