//! Device assembly and the `run` / `simulate` / `check` commands.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cover_core::runner::{CommandSource, RunParams, RunSummary};
use cover_core::util::{ms_to_secs, position_percent};
use cover_core::{
    ActuatorCfg, ActuatorDriver, CoverCommand, CoverSnapshot, Script, SingleControlCover,
    TimingCfg,
};
use cover_hardware::{DoorSpec, SimulatedDoor};
use cover_traits::{Activatable, BinaryState, Clock, ManualClock, MonotonicClock};
use eyre::WrapErr;
use serde_json::json;

/// Options of the `simulate` command.
#[derive(Debug, Clone)]
pub struct SimOptions {
    pub script: String,
    pub duration_ms: Option<u64>,
    pub door_open_ms: Option<u64>,
    pub door_close_ms: Option<u64>,
    pub start_position: f32,
    pub broken_open_endstop: bool,
    pub broken_close_endstop: bool,
    pub input_fault: bool,
}

/// Build the cover from validated config and the given devices.
pub fn build_cover(
    cfg: &cover_config::Config,
    activator: impl Activatable + 'static,
    open_endstop: impl BinaryState + 'static,
    close_endstop: impl BinaryState + 'static,
) -> eyre::Result<SingleControlCover> {
    let timing = TimingCfg::try_from(cfg)?;
    let cover = SingleControlCover::builder()
        .with_activator(activator)
        .with_open_endstop(open_endstop)
        .with_close_endstop(close_endstop)
        .with_timing(timing)
        .with_endstop_cfg((&cfg.cover).into())
        .with_reverse_policy(cfg.cover.reverse_policy.into())
        .build()?;
    cover.log_config(&cfg.cover.name);
    Ok(cover)
}

/// 95% of the configured travel: real openers usually beat their rated time.
fn default_travel(configured_ms: u64) -> Duration {
    Duration::from_millis(configured_ms.saturating_mul(95) / 100)
}

fn sim_door(
    cfg: &cover_config::Config,
    spec: DoorSpec,
    clock: Arc<dyn Clock + Send + Sync>,
) -> eyre::Result<(SingleControlCover, SimulatedDoor)> {
    let door = SimulatedDoor::new(spec, clock.clone());
    let activation = cfg.cover.activation()?;
    let input = door.input_line_with(activation.device.active_low);
    let driver = ActuatorDriver::new(input, &ActuatorCfg::from(&activation), clock)
        .wrap_err("initialize simulated activation output")?;
    let cover = build_cover(cfg, driver, door.open_endstop(), door.close_endstop())?;
    Ok((cover, door))
}

pub fn print_snapshot(now_ms: u64, s: &CoverSnapshot, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "t_ms": now_ms,
                "state": s.state.as_str(),
                "operation": s.operation.as_str(),
                "position": s.position,
                "target_position": s.target_position,
                "endstop_timeouts": s.endstop_timeouts,
                "activations": s.activations,
            })
        );
    } else {
        let target = s
            .target_position
            .map(|t| format!(" target={}%", position_percent(t)))
            .unwrap_or_default();
        println!(
            "{:>8.2}s  {:<15} {:>3}%{target}",
            ms_to_secs(now_ms),
            s.state.as_str(),
            position_percent(s.position),
        );
    }
}

pub fn print_summary(summary: &RunSummary, door_position: Option<f32>, json: bool) {
    let s = &summary.snapshot;
    if json {
        println!(
            "{}",
            json!({
                "final": true,
                "elapsed_ms": summary.elapsed_ms,
                "state": s.state.as_str(),
                "position": s.position,
                "door_position": door_position,
                "endstop_timeouts": s.endstop_timeouts,
                "activations": s.activations,
            })
        );
    } else {
        println!(
            "final: state={} position={}% elapsed={:.2}s activations={} endstop_timeouts={}",
            s.state.as_str(),
            position_percent(s.position),
            ms_to_secs(summary.elapsed_ms),
            s.activations,
            s.endstop_timeouts,
        );
        if let Some(p) = door_position {
            println!("simulated door at {}%", position_percent(p));
        }
    }
}

pub fn run_check(cfg: &cover_config::Config, json: bool) -> eyre::Result<()> {
    let activation = cfg.cover.activation()?;
    let c = &cfg.cover;
    let kind = match activation.kind {
        cover_config::ActivationKind::Button => "button",
        cover_config::ActivationKind::Switch => "switch",
    };
    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "name": c.name,
                "activation": {
                    "kind": kind,
                    "device": activation.device.label(),
                    "pin": activation.device.pin,
                    "interval_ms": activation.interval_ms,
                },
                "open_endstop": { "device": c.open_endstop.label(), "pin": c.open_endstop.pin },
                "close_endstop": { "device": c.close_endstop.label(), "pin": c.close_endstop.pin },
                "open_duration_ms": c.open_duration,
                "close_duration_ms": c.close_duration,
                "endstop_debounce_ms": c.endstop_debounce,
                "setup_delay_ms": c.setup_delay,
                "tick_ms": cfg.runner.tick_ms,
            })
        );
    } else {
        println!("config OK: {}", c.name);
        println!(
            "  activation: {kind} {} (pin {}), interval {:.1}s",
            activation.device.label(),
            activation.device.pin,
            ms_to_secs(activation.interval_ms)
        );
        println!(
            "  open endstop: {} (pin {}), open duration {:.1}s",
            c.open_endstop.label(),
            c.open_endstop.pin,
            ms_to_secs(c.open_duration)
        );
        println!(
            "  close endstop: {} (pin {}), close duration {:.1}s",
            c.close_endstop.label(),
            c.close_endstop.pin,
            ms_to_secs(c.close_duration)
        );
        println!(
            "  debounce {}ms, setup delay {:.1}s, tick {}ms",
            c.endstop_debounce,
            ms_to_secs(c.setup_delay),
            cfg.runner.tick_ms
        );
    }
    Ok(())
}

pub fn run_simulation(
    cfg: &cover_config::Config,
    opts: &SimOptions,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<RunSummary> {
    let mut script: Script = opts.script.parse()?;

    let clock = ManualClock::new();
    let spec = DoorSpec {
        open_travel: opts
            .door_open_ms
            .map_or_else(|| default_travel(cfg.cover.open_duration), Duration::from_millis),
        close_travel: opts
            .door_close_ms
            .map_or_else(|| default_travel(cfg.cover.close_duration), Duration::from_millis),
        start_position: opts.start_position,
        broken_open_endstop: opts.broken_open_endstop,
        broken_close_endstop: opts.broken_close_endstop,
    };
    let (mut cover, door) = sim_door(cfg, spec, Arc::new(clock.clone()))?;
    door.set_input_fault(opts.input_fault);

    let longest = cfg.cover.open_duration.max(cfg.cover.close_duration);
    let limit = opts
        .duration_ms
        .unwrap_or_else(|| script.last_at_ms() + 2 * longest + 1_000);
    let params = RunParams {
        run_for_ms: Some(limit),
        stop_when_settled: true,
        ..RunParams::from(cfg)
    };
    tracing::info!(entries = script.entries().len(), limit_ms = limit, "simulation started");

    let summary = cover_core::run(&mut cover, &clock, &mut script, &params, shutdown, |now, s| {
        print_snapshot(now, s, json);
    })?;
    print_summary(&summary, Some(door.position()), json);
    Ok(summary)
}

/// Forward stdin lines to the control loop. Unparseable lines are logged and dropped.
fn spawn_stdin_reader() -> crossbeam_channel::Receiver<CoverCommand> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            match text.parse::<CoverCommand>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(input = text, error = %e, "ignoring input line"),
            }
        }
        tracing::debug!("stdin closed");
    });
    rx
}

fn live_loop(
    cfg: &cover_config::Config,
    cover: &mut SingleControlCover,
    source: &mut dyn CommandSource,
    run_for_ms: Option<u64>,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<RunSummary> {
    let params = RunParams {
        run_for_ms,
        ..RunParams::from(cfg)
    };
    let clock = MonotonicClock::new();
    cover_core::run(cover, &clock, source, &params, shutdown, |now, s| {
        print_snapshot(now, s, json);
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn run_live(
    cfg: &cover_config::Config,
    run_for_ms: Option<u64>,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<RunSummary> {
    use cover_hardware::{GpioEndstop, GpioLine};

    let activation = cfg.cover.activation()?;
    let line = GpioLine::new(activation.device.pin).wrap_err("open activation output")?;
    let driver = ActuatorDriver::new(
        line,
        &ActuatorCfg::from(&activation),
        Arc::new(MonotonicClock::new()),
    )
    .wrap_err("initialize activation output")?;
    let open = GpioEndstop::new(cfg.cover.open_endstop.pin, cfg.cover.open_endstop.active_low)
        .wrap_err("open endstop input")?;
    let close = GpioEndstop::new(cfg.cover.close_endstop.pin, cfg.cover.close_endstop.active_low)
        .wrap_err("close endstop input")?;
    let mut cover = build_cover(cfg, driver, open, close)?;

    let mut rx = spawn_stdin_reader();
    let summary = live_loop(cfg, &mut cover, &mut rx, run_for_ms, shutdown, json)?;
    print_summary(&summary, None, json);
    Ok(summary)
}

/// Without GPIO support the live loop drives a simulated door in real time.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn run_live(
    cfg: &cover_config::Config,
    run_for_ms: Option<u64>,
    shutdown: &AtomicBool,
    json: bool,
) -> eyre::Result<RunSummary> {
    tracing::warn!("built without the `hardware` feature; driving a simulated door");
    let spec = DoorSpec {
        open_travel: default_travel(cfg.cover.open_duration),
        close_travel: default_travel(cfg.cover.close_duration),
        ..DoorSpec::default()
    };
    let (mut cover, door) = sim_door(cfg, spec, Arc::new(MonotonicClock::new()))?;

    let mut rx = spawn_stdin_reader();
    let summary = live_loop(cfg, &mut cover, &mut rx, run_for_ms, shutdown, json)?;
    print_summary(&summary, Some(door.position()), json);
    Ok(summary)
}
