//! Actuator driver: turns an `OutputLine` into an `Activatable`.
//!
//! `activate()` only asserts the line and returns; the timed release happens in
//! `service()`, which the run loop calls on every iteration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cover_traits::{Activatable, Clock, OutputLine};

use crate::config::{ActuatorCfg, ActuatorKind};
use crate::error::{CoverError, Result};
use crate::hw_error::map_hw_error;
use eyre::WrapErr;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct ActuatorDriver<O: OutputLine> {
    line: O,
    kind: ActuatorKind,
    interval: Duration,
    active_low: bool,
    clock: Arc<dyn Clock + Send + Sync>,
    /// Deadline and the level to restore once it passes.
    release: Option<(Instant, bool)>,
    activations: u64,
}

impl<O: OutputLine> core::fmt::Debug for ActuatorDriver<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActuatorDriver")
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .field("asserted", &self.release.is_some())
            .field("activations", &self.activations)
            .finish()
    }
}

impl<O: OutputLine> ActuatorDriver<O> {
    /// Wrap `line`. A pulse driver parks the line at its inactive level.
    pub fn new(mut line: O, cfg: &ActuatorCfg, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self> {
        if cfg.interval_ms == 0 {
            return Err(eyre::Report::new(CoverError::Config(
                "activation interval must be > 0".into(),
            )));
        }
        if cfg.kind == ActuatorKind::Pulse {
            line.set_level(cfg.active_low)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err("initialize activation output")?;
        }
        Ok(Self {
            line,
            kind: cfg.kind,
            interval: Duration::from_millis(cfg.interval_ms),
            active_low: cfg.active_low,
            clock,
            release: None,
            activations: 0,
        })
    }

    /// True while a pulse or toggle is waiting for its release.
    pub fn is_asserted(&self) -> bool {
        self.release.is_some()
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn line(&self) -> &O {
        &self.line
    }
}

impl<O: OutputLine> Activatable for ActuatorDriver<O> {
    fn activate(&mut self) -> std::result::Result<(), BoxError> {
        if self.release.is_some() {
            return Err(Box::new(CoverError::State(
                "activation already in progress".into(),
            )));
        }
        let restore = self.line.is_set_high();
        let level = match self.kind {
            ActuatorKind::Pulse => !self.active_low,
            ActuatorKind::Toggle => !restore,
        };
        self.line.set_level(level)?;
        self.release = Some((self.clock.now() + self.interval, restore));
        self.activations = self.activations.saturating_add(1);
        tracing::debug!(
            kind = ?self.kind,
            level,
            interval_ms = self.interval.as_millis() as u64,
            "activation asserted"
        );
        Ok(())
    }

    fn service(&mut self) -> std::result::Result<(), BoxError> {
        let Some((deadline, restore)) = self.release else {
            return Ok(());
        };
        if self.clock.now() < deadline {
            return Ok(());
        }
        let level = match self.kind {
            ActuatorKind::Pulse => self.active_low,
            ActuatorKind::Toggle => restore,
        };
        self.line.set_level(level)?;
        self.release = None;
        tracing::debug!(level, "activation released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cover_traits::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every level written.
    #[derive(Clone, Default)]
    struct RecordingLine {
        high: bool,
        writes: Rc<RefCell<Vec<bool>>>,
    }

    impl OutputLine for RecordingLine {
        fn set_level(&mut self, high: bool) -> std::result::Result<(), BoxError> {
            self.high = high;
            self.writes.borrow_mut().push(high);
            Ok(())
        }
        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    fn cfg(kind: ActuatorKind, active_low: bool) -> ActuatorCfg {
        ActuatorCfg {
            kind,
            interval_ms: 500,
            active_low,
        }
    }

    #[test]
    fn pulse_asserts_then_releases_after_interval() {
        let clock = ManualClock::new();
        let line = RecordingLine::default();
        let writes = line.writes.clone();
        let mut drv =
            ActuatorDriver::new(line, &cfg(ActuatorKind::Pulse, false), Arc::new(clock.clone()))
                .unwrap();
        drv.activate().unwrap();
        assert!(drv.line().is_set_high());
        clock.advance(Duration::from_millis(499));
        drv.service().unwrap();
        assert!(drv.is_asserted());
        clock.advance(Duration::from_millis(1));
        drv.service().unwrap();
        assert!(!drv.is_asserted());
        assert_eq!(*writes.borrow(), vec![false, true, false]);
        assert_eq!(drv.activations(), 1);
    }

    #[test]
    fn active_low_pulse_drives_low() {
        let clock = ManualClock::new();
        let mut drv = ActuatorDriver::new(
            RecordingLine::default(),
            &cfg(ActuatorKind::Pulse, true),
            Arc::new(clock.clone()),
        )
        .unwrap();
        assert!(drv.line().is_set_high());
        drv.activate().unwrap();
        assert!(!drv.line().is_set_high());
        clock.advance(Duration::from_millis(500));
        drv.service().unwrap();
        assert!(drv.line().is_set_high());
    }

    #[test]
    fn toggle_flips_and_restores() {
        let clock = ManualClock::new();
        let line = RecordingLine {
            high: true,
            ..Default::default()
        };
        let mut drv =
            ActuatorDriver::new(line, &cfg(ActuatorKind::Toggle, false), Arc::new(clock.clone()))
                .unwrap();
        drv.activate().unwrap();
        assert!(!drv.line().is_set_high());
        clock.advance(Duration::from_millis(600));
        drv.service().unwrap();
        assert!(drv.line().is_set_high());
    }

    #[test]
    fn second_activation_while_asserted_is_rejected() {
        let clock = ManualClock::new();
        let mut drv = ActuatorDriver::new(
            RecordingLine::default(),
            &cfg(ActuatorKind::Pulse, false),
            Arc::new(clock),
        )
        .unwrap();
        drv.activate().unwrap();
        let err = drv.activate().unwrap_err();
        assert!(err.to_string().contains("already in progress"));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut c = cfg(ActuatorKind::Pulse, false);
        c.interval_ms = 0;
        assert!(ActuatorDriver::new(RecordingLine::default(), &c, Arc::new(ManualClock::new())).is_err());
    }
}
