//! Type-state builder for `SingleControlCover`.
//!
//! `build()` is only available once the activation device and both endstops
//! are provided. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;

use cover_traits::{Activatable, BinaryState};

use crate::config::{EndstopCfg, ReversePolicy, TimingCfg};
use crate::cover::SingleControlCover;
use crate::endstop::EndstopMonitor;
use crate::error::{BuildError, Result};

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `SingleControlCover`. All fields are validated on `build()`.
pub struct CoverBuilder<A, O, C> {
    activator: Option<Box<dyn Activatable>>,
    open_endstop: Option<Box<dyn BinaryState>>,
    close_endstop: Option<Box<dyn BinaryState>>,
    timing: Option<TimingCfg>,
    endstop: Option<EndstopCfg>,
    policy: ReversePolicy,
    _a: PhantomData<A>,
    _o: PhantomData<O>,
    _c: PhantomData<C>,
}

impl Default for CoverBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            activator: None,
            open_endstop: None,
            close_endstop: None,
            timing: None,
            endstop: None,
            policy: ReversePolicy::default(),
            _a: PhantomData,
            _o: PhantomData,
            _c: PhantomData,
        }
    }
}

impl SingleControlCover {
    /// Start building a cover.
    pub fn builder() -> CoverBuilder<Missing, Missing, Missing> {
        CoverBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate timing, then assemble the cover and derive its initial state from
/// the endstops.
fn validate_and_build(
    activator: Box<dyn Activatable>,
    open_endstop: Box<dyn BinaryState>,
    close_endstop: Box<dyn BinaryState>,
    timing: TimingCfg,
    endstop: EndstopCfg,
    policy: ReversePolicy,
) -> Result<SingleControlCover> {
    if timing.open_duration_ms == 0 {
        return Err(invalid("open_duration_ms must be > 0"));
    }
    if timing.close_duration_ms == 0 {
        return Err(invalid("close_duration_ms must be > 0"));
    }
    if timing.activation_interval_ms == 0 {
        return Err(invalid("activation_interval_ms must be > 0"));
    }
    let shortest = timing.open_duration_ms.min(timing.close_duration_ms);
    if endstop.debounce_ms >= shortest {
        return Err(invalid("endstop debounce must be shorter than travel durations"));
    }

    let monitor = EndstopMonitor::new(open_endstop, close_endstop, endstop.debounce_ms);
    let mut cover = SingleControlCover::from_parts(activator, monitor, timing, policy);
    cover.sync_from_endstops();
    // Construction is not a state change the host needs to hear about
    cover.drain_events();
    Ok(cover)
}

impl<A, O, C> CoverBuilder<A, O, C> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<SingleControlCover> {
        let activator = self
            .activator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActivator))?;
        let open_endstop = self
            .open_endstop
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOpenEndstop))?;
        let close_endstop = self
            .close_endstop
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCloseEndstop))?;

        validate_and_build(
            activator,
            open_endstop,
            close_endstop,
            self.timing.unwrap_or_default(),
            self.endstop.unwrap_or_default(),
            self.policy,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<A, O, C> CoverBuilder<A, O, C> {
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_endstop_cfg(mut self, endstop: EndstopCfg) -> Self {
        self.endstop = Some(endstop);
        self
    }
    pub fn with_reverse_policy(mut self, policy: ReversePolicy) -> Self {
        self.policy = policy;
        self
    }
}

// Setters that advance type-state
impl<O, C> CoverBuilder<Missing, O, C> {
    pub fn with_activator(self, activator: impl Activatable + 'static) -> CoverBuilder<Set, O, C> {
        CoverBuilder {
            activator: Some(Box::new(activator)),
            open_endstop: self.open_endstop,
            close_endstop: self.close_endstop,
            timing: self.timing,
            endstop: self.endstop,
            policy: self.policy,
            _a: PhantomData,
            _o: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<A, C> CoverBuilder<A, Missing, C> {
    pub fn with_open_endstop(self, sensor: impl BinaryState + 'static) -> CoverBuilder<A, Set, C> {
        CoverBuilder {
            activator: self.activator,
            open_endstop: Some(Box::new(sensor)),
            close_endstop: self.close_endstop,
            timing: self.timing,
            endstop: self.endstop,
            policy: self.policy,
            _a: PhantomData,
            _o: PhantomData,
            _c: PhantomData,
        }
    }
}

impl<A, O> CoverBuilder<A, O, Missing> {
    pub fn with_close_endstop(self, sensor: impl BinaryState + 'static) -> CoverBuilder<A, O, Set> {
        CoverBuilder {
            activator: self.activator,
            open_endstop: self.open_endstop,
            close_endstop: Some(Box::new(sensor)),
            timing: self.timing,
            endstop: self.endstop,
            policy: self.policy,
            _a: PhantomData,
            _o: PhantomData,
            _c: PhantomData,
        }
    }
}

impl CoverBuilder<Set, Set, Set> {
    /// Validate and build the cover. Only available when all three devices are set.
    pub fn build(self) -> Result<SingleControlCover> {
        self.try_build()
    }
}
