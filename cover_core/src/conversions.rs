//! Conversions bridging `cover_config` types to `cover_core` types.

use crate::config::{ActuatorCfg, ActuatorKind, EndstopCfg, ReversePolicy, TimingCfg};
use crate::runner::RunParams;

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl TryFrom<&cover_config::Config> for TimingCfg {
    type Error = eyre::Report;

    fn try_from(c: &cover_config::Config) -> Result<Self, Self::Error> {
        let activation = c.cover.activation()?;
        Ok(Self {
            open_duration_ms: c.cover.open_duration,
            close_duration_ms: c.cover.close_duration,
            activation_interval_ms: activation.interval_ms,
        })
    }
}

// ── EndstopCfg ───────────────────────────────────────────────────────────────

impl From<&cover_config::CoverCfg> for EndstopCfg {
    fn from(c: &cover_config::CoverCfg) -> Self {
        Self {
            debounce_ms: c.endstop_debounce,
        }
    }
}

// ── ReversePolicy ────────────────────────────────────────────────────────────

impl From<cover_config::ReversePolicy> for ReversePolicy {
    fn from(p: cover_config::ReversePolicy) -> Self {
        match p {
            cover_config::ReversePolicy::StopThenReverse => ReversePolicy::StopThenReverse,
            cover_config::ReversePolicy::Ignore => ReversePolicy::Ignore,
        }
    }
}

// ── ActuatorCfg ──────────────────────────────────────────────────────────────

impl From<&cover_config::Activation> for ActuatorCfg {
    fn from(a: &cover_config::Activation) -> Self {
        Self {
            kind: match a.kind {
                cover_config::ActivationKind::Button => ActuatorKind::Pulse,
                cover_config::ActivationKind::Switch => ActuatorKind::Toggle,
            },
            interval_ms: a.interval_ms,
            active_low: a.device.active_low,
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

impl From<&cover_config::Config> for RunParams {
    fn from(c: &cover_config::Config) -> Self {
        Self {
            tick_ms: c.runner.tick_ms,
            publish_interval_ms: c.cover.publish_interval,
            setup_delay_ms: c.cover.setup_delay,
            run_for_ms: None,
            stop_when_settled: false,
        }
    }
}
