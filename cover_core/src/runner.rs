//! Cooperative run loop.
//!
//! One thread does everything in order: take due commands, tick the cover,
//! publish, sleep one tick. Time comes from a `Clock`, so a `ManualClock`
//! runs a whole simulated session without real waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cover_traits::Clock;

use crate::command::{CoverCommand, Script};
use crate::cover::SingleControlCover;
use crate::error::{CoverError, Result as CoreResult};
use crate::state::{CoverEvent, CoverSnapshot};

/// Where commands come from.
pub trait CommandSource {
    /// Commands that became available by `now_ms`.
    fn poll(&mut self, now_ms: u64) -> Vec<CoverCommand>;

    /// No command will ever arrive again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl CommandSource for crossbeam_channel::Receiver<CoverCommand> {
    fn poll(&mut self, _now_ms: u64) -> Vec<CoverCommand> {
        self.try_iter().collect()
    }
}

impl CommandSource for Script {
    fn poll(&mut self, now_ms: u64) -> Vec<CoverCommand> {
        self.take_due(now_ms)
    }

    fn is_exhausted(&self) -> bool {
        self.is_done()
    }
}

#[derive(Debug, Clone)]
pub struct RunParams {
    /// Loop period.
    pub tick_ms: u64,
    /// Snapshot period while moving; state changes always publish.
    pub publish_interval_ms: u64,
    /// Re-sync from the endstops once this long after start (0 = never).
    pub setup_delay_ms: u64,
    /// Hard stop for the loop.
    pub run_for_ms: Option<u64>,
    /// End once the source is exhausted and the door is still with nothing pending.
    pub stop_when_settled: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            publish_interval_ms: 1000,
            setup_delay_ms: 0,
            run_for_ms: None,
            stop_when_settled: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub snapshot: CoverSnapshot,
    pub elapsed_ms: u64,
}

fn is_invalid_command(e: &eyre::Report) -> bool {
    matches!(
        e.downcast_ref::<CoverError>(),
        Some(CoverError::InvalidCommand(_))
    )
}

/// Drive `cover` until shutdown, the time limit, or (optionally) settling.
///
/// `publish` receives the initial snapshot, every state change, and periodic
/// snapshots while the door moves. Invalid commands are logged and skipped;
/// device faults end the run with an error.
pub fn run<C, S, P>(
    cover: &mut SingleControlCover,
    clock: &C,
    source: &mut S,
    params: &RunParams,
    shutdown: &AtomicBool,
    mut publish: P,
) -> CoreResult<RunSummary>
where
    C: Clock + ?Sized,
    S: CommandSource + ?Sized,
    P: FnMut(u64, &CoverSnapshot),
{
    let epoch = clock.now();
    let tick = Duration::from_millis(params.tick_ms.max(1));
    let mut resync_due = params.setup_delay_ms > 0;
    let mut last_publish_ms = 0u64;

    tracing::info!(
        tick_ms = params.tick_ms,
        setup_delay_ms = params.setup_delay_ms,
        run_for_ms = ?params.run_for_ms,
        "cover loop started"
    );
    publish(0, &cover.snapshot());

    loop {
        let now = clock.ms_since(epoch);
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(now_ms = now, "shutdown requested");
            break;
        }
        if params.run_for_ms.is_some_and(|limit| now >= limit) {
            break;
        }

        // Sensors that settle late get a second look once the delay passes
        if resync_due && now >= params.setup_delay_ms && cover.resync() {
            resync_due = false;
        }

        for cmd in source.poll(now) {
            if let Err(e) = cover.apply(cmd, now) {
                if is_invalid_command(&e) {
                    tracing::warn!(command = %cmd, error = %e, "command rejected");
                    continue;
                }
                return Err(e);
            }
        }

        cover.tick(now)?;

        let changed = cover
            .drain_events()
            .iter()
            .any(|e| matches!(e, CoverEvent::StateChanged { .. }));
        let snapshot = cover.snapshot();
        let periodic = snapshot.state.is_moving()
            && now.saturating_sub(last_publish_ms) >= params.publish_interval_ms;
        if changed || periodic {
            publish(now, &snapshot);
            last_publish_ms = now;
        }

        if params.stop_when_settled
            && source.is_exhausted()
            && !cover.is_moving()
            && !cover.has_pending()
        {
            break;
        }

        clock.sleep(tick);
    }

    let summary = RunSummary {
        snapshot: cover.snapshot(),
        elapsed_ms: clock.ms_since(epoch),
    };
    tracing::info!(
        elapsed_ms = summary.elapsed_ms,
        state = %summary.snapshot.state,
        position = summary.snapshot.position,
        "cover loop finished"
    );
    Ok(summary)
}
