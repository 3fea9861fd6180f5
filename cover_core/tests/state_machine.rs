use cover_core::mocks::{CountingActivator, SharedEndstop};
use cover_core::{
    CoverCommand, CoverError, CoverEvent, CoverOperation, CoverState, Endstop, EndstopCfg,
    ReversePolicy, SingleControlCover, TimingCfg,
};
use rstest::rstest;

struct Rig {
    cover: SingleControlCover,
    open: SharedEndstop,
    close: SharedEndstop,
    activator: CountingActivator,
}

fn rig_with(open_active: bool, close_active: bool, policy: ReversePolicy, debounce_ms: u64) -> Rig {
    let open = SharedEndstop::new(open_active);
    let close = SharedEndstop::new(close_active);
    let activator = CountingActivator::new();
    let cover = SingleControlCover::builder()
        .with_activator(activator.clone())
        .with_open_endstop(open.clone())
        .with_close_endstop(close.clone())
        .with_timing(TimingCfg {
            open_duration_ms: 10_000,
            close_duration_ms: 10_000,
            activation_interval_ms: 500,
        })
        .with_endstop_cfg(EndstopCfg { debounce_ms })
        .with_reverse_policy(policy)
        .build()
        .expect("build cover");
    Rig {
        cover,
        open,
        close,
        activator,
    }
}

fn closed() -> Rig {
    rig_with(false, true, ReversePolicy::StopThenReverse, 0)
}

fn opened() -> Rig {
    rig_with(true, false, ReversePolicy::StopThenReverse, 0)
}

fn close_to(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[rstest]
#[case(true, false, CoverState::IdleOpen, 1.0)]
#[case(false, true, CoverState::IdleClosed, 0.0)]
#[case(false, false, CoverState::StoppedPartial, 0.5)]
#[case(true, true, CoverState::StoppedPartial, 0.5)]
fn initial_state_follows_endstops(
    #[case] open: bool,
    #[case] close: bool,
    #[case] state: CoverState,
    #[case] position: f32,
) {
    let rig = rig_with(open, close, ReversePolicy::StopThenReverse, 0);
    assert_eq!(rig.cover.state(), state);
    assert_eq!(rig.cover.position(), position);
    assert_eq!(rig.activator.count(), 0);
}

#[test]
fn open_runs_on_the_timer_and_falls_back_without_endstop() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert_eq!(rig.activator.count(), 1);
    rig.close.set(false);

    rig.cover.tick(5_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert_eq!(rig.cover.position(), 0.5);

    rig.cover.tick(10_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::IdleOpen);
    assert_eq!(rig.cover.position(), 1.0);
    assert_eq!(rig.cover.endstop_timeouts(), 1);
    assert!(
        rig.cover
            .drain_events()
            .contains(&CoverEvent::EndstopTimeout {
                direction: cover_core::Direction::Open
            })
    );
}

#[test]
fn endstop_overrides_the_estimate() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.close.set(false);
    rig.cover.tick(3_000).unwrap();
    assert!(close_to(rig.cover.position(), 0.3));

    rig.open.set(true);
    rig.cover.tick(3_100).unwrap();
    assert_eq!(rig.cover.state(), CoverState::IdleOpen);
    assert_eq!(rig.cover.position(), 1.0);
    assert!(rig.cover.motion().is_none());
    assert_eq!(rig.cover.endstop_timeouts(), 0);
}

#[test]
fn open_endstop_while_closing_is_ignored() {
    let mut rig = opened();
    rig.cover.close(0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    rig.open.set(false);
    rig.cover.tick(100).unwrap();
    rig.cover.tick(2_000).unwrap();
    assert!(close_to(rig.cover.position(), 0.8));
    rig.cover.drain_events();

    rig.open.set(true);
    rig.cover.tick(2_100).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    assert!(close_to(rig.cover.position(), 0.79));
    assert!(rig.cover.drain_events().contains(&CoverEvent::AnomalousEndstop {
        endstop: Endstop::Open
    }));
}

#[test]
fn stop_then_close_resumes_from_estimate() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.close.set(false);
    rig.cover.tick(4_000).unwrap();
    rig.cover.stop(4_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    assert!(close_to(rig.cover.position(), 0.4));
    assert!(rig.cover.motion().is_none());

    rig.cover.close(5_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    let op = *rig.cover.motion().expect("moving");
    assert!(close_to(op.start_position, 0.4));
    assert!(close_to(rig.cover.position(), 0.4));

    rig.cover.tick(6_000).unwrap();
    assert!(close_to(rig.cover.position(), 0.3));
    assert_eq!(rig.activator.count(), 3);
}

#[test]
fn resuming_in_the_last_direction_cycles_through_the_other() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.close.set(false);
    rig.cover.tick(4_000).unwrap();
    rig.cover.stop(4_000).unwrap();

    // Opener would close next; a stop and a second start are needed
    rig.cover.open(4_100).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    assert!(rig.cover.has_pending());

    rig.cover.tick(4_600).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    rig.cover.tick(4_700).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    rig.cover.tick(5_200).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    rig.cover.tick(5_800).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert!(!rig.cover.has_pending());
    assert_eq!(rig.activator.count(), 5);
    assert!(close_to(rig.cover.position(), 0.34));
}

#[test]
fn open_while_opening_keeps_the_operation() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.cover.tick(2_000).unwrap();
    rig.cover.open(2_000).unwrap();
    assert_eq!(rig.cover.motion().expect("moving").start_ms, 0);
    assert_eq!(rig.activator.count(), 1);
    rig.cover.tick(5_000).unwrap();
    assert_eq!(rig.cover.position(), 0.5);
}

#[test]
fn open_when_open_does_nothing() {
    let mut rig = opened();
    rig.cover.open(0).unwrap();
    rig.cover.tick(1_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::IdleOpen);
    assert_eq!(rig.activator.count(), 0);
}

#[test]
fn reversal_takes_two_spaced_activations() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.close.set(false);
    rig.cover.tick(3_000).unwrap();
    rig.cover.drain_events();

    rig.cover.close(3_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    rig.cover.tick(3_200).unwrap();
    rig.cover.tick(3_500).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    rig.cover.tick(3_501).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    assert_eq!(rig.activator.count(), 3);

    let presses: Vec<u64> = rig
        .cover
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            CoverEvent::Activated { at_ms } => Some(at_ms),
            _ => None,
        })
        .collect();
    assert_eq!(presses, vec![3_000, 3_501]);
}

#[test]
fn ignore_policy_keeps_moving() {
    let mut rig = rig_with(false, true, ReversePolicy::Ignore, 0);
    rig.cover.open(0).unwrap();
    rig.cover.tick(3_000).unwrap();
    rig.cover.close(3_000).unwrap();
    rig.cover.tick(4_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert_eq!(rig.activator.count(), 1);
}

#[test]
fn stop_between_reversal_activations_cancels_the_reversal() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.cover.tick(3_000).unwrap();
    rig.cover.close(3_000).unwrap();
    rig.cover.stop(3_100).unwrap();
    rig.cover.tick(4_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    assert_eq!(rig.activator.count(), 2);
}

#[test]
fn partial_target_stops_near_the_target() {
    let mut rig = closed();
    rig.cover.set_position(0.3, 0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    rig.close.set(false);

    let mut t = 0;
    while rig.cover.is_moving() && t < 10_000 {
        t += 100;
        rig.cover.tick(t).unwrap();
    }
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    assert!((rig.cover.position() - 0.3).abs() < 0.011);
    assert_eq!(rig.activator.count(), 2);
}

#[rstest]
#[case::full_position(CoverCommand::Position(1.0))]
#[case::open(CoverCommand::Open)]
fn full_open_replaces_partial_target_while_opening(#[case] command: CoverCommand) {
    let mut rig = closed();
    rig.cover.set_position(0.3, 0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    rig.close.set(false);
    rig.cover.tick(1_000).unwrap();

    rig.cover.apply(command, 1_000).unwrap();
    assert_eq!(rig.cover.target_position(), Some(1.0));
    assert_eq!(rig.cover.motion().map(|m| m.start_ms), Some(0));

    // Past the old target the door keeps going
    for t in (1_100..=6_000).step_by(100) {
        rig.cover.tick(t).unwrap();
    }
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert!(close_to(rig.cover.position(), 0.6));
    assert_eq!(rig.activator.count(), 1);
}

#[test]
fn position_one_and_zero_delegate_to_open_and_close() {
    let mut rig = closed();
    rig.cover.set_position(1.0, 0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert_eq!(rig.cover.target_position(), Some(1.0));

    let mut rig = opened();
    rig.cover.set_position(-3.0, 0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    assert_eq!(rig.cover.target_position(), Some(0.0));
}

#[test]
fn non_finite_position_is_an_invalid_command() {
    let mut rig = closed();
    let err = rig.cover.set_position(f32::NAN, 0).expect_err("rejected");
    assert!(matches!(
        err.downcast_ref::<CoverError>(),
        Some(CoverError::InvalidCommand(_))
    ));
    assert_eq!(rig.cover.state(), CoverState::IdleClosed);
}

#[test]
fn toggle_is_a_single_activation() {
    let mut rig = closed();
    rig.cover.apply(CoverCommand::Toggle, 0).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert_eq!(rig.cover.target_position(), Some(1.0));

    // Too soon: waits for the interval
    rig.cover.apply(CoverCommand::Toggle, 100).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    rig.cover.tick(600).unwrap();
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    assert!(close_to(rig.cover.position(), 0.06));
    assert_eq!(rig.activator.count(), 2);
}

#[test]
fn device_fault_is_returned_and_state_kept() {
    let mut rig = closed();
    rig.activator.set_failing(true);
    let err = rig.cover.open(0).expect_err("device fault");
    let fault = err
        .chain()
        .find_map(|e| e.downcast_ref::<CoverError>())
        .cloned();
    match fault {
        Some(CoverError::DeviceFault(msg)) => assert!(msg.contains("not responding")),
        other => panic!("expected DeviceFault, got {other:?}"),
    }
    assert_eq!(rig.cover.state(), CoverState::IdleClosed);
    assert!(!rig.cover.has_pending());

    // Not retried on the next tick
    rig.activator.set_failing(false);
    rig.cover.tick(1_000).unwrap();
    assert_eq!(rig.cover.state(), CoverState::IdleClosed);
    assert_eq!(rig.activator.count(), 0);
}

#[test]
fn leaving_an_endstop_unprompted_is_external_motion() {
    let mut rig = opened();
    rig.open.set(false);
    rig.cover.tick(100).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Closing);
    assert_eq!(rig.cover.target_position(), Some(0.0));
    assert_eq!(rig.activator.count(), 0);
    assert!(rig.cover.drain_events().contains(&CoverEvent::ExternalMotion {
        direction: cover_core::Direction::Close
    }));

    rig.cover.tick(1_100).unwrap();
    assert!(close_to(rig.cover.position(), 0.9));
}

#[test]
fn short_flap_is_absorbed_by_debounce() {
    let mut rig = rig_with(false, true, ReversePolicy::StopThenReverse, 50);
    rig.cover.open(0).unwrap();
    rig.close.set(false);
    for t in (20..=200).step_by(20) {
        rig.cover.tick(t).unwrap();
    }
    rig.cover.drain_events();

    rig.open.set(true);
    rig.cover.tick(220).unwrap();
    rig.open.set(false);
    rig.cover.tick(240).unwrap();
    rig.cover.tick(300).unwrap();
    assert_eq!(rig.cover.state(), CoverState::Opening);
    assert!(rig.cover.drain_events().is_empty());
}

#[test]
fn resync_reads_late_endstops_only_when_idle() {
    let mut rig = rig_with(false, false, ReversePolicy::StopThenReverse, 0);
    assert_eq!(rig.cover.state(), CoverState::StoppedPartial);
    rig.close.set(true);
    assert!(rig.cover.resync());
    assert_eq!(rig.cover.state(), CoverState::IdleClosed);
    assert_eq!(rig.cover.position(), 0.0);

    rig.cover.open(0).unwrap();
    assert!(!rig.cover.resync());
    assert_eq!(rig.cover.state(), CoverState::Opening);
}

#[test]
fn snapshot_reports_operation_and_counters() {
    let mut rig = closed();
    rig.cover.open(0).unwrap();
    rig.cover.tick(2_500).unwrap();
    let snap = rig.cover.snapshot();
    assert_eq!(snap.state, CoverState::Opening);
    assert_eq!(snap.operation, CoverOperation::Opening);
    assert_eq!(snap.position, 0.25);
    assert_eq!(snap.target_position, Some(1.0));
    assert_eq!(snap.activations, 1);
    assert_eq!(snap.endstop_timeouts, 0);

    let traits = rig.cover.traits();
    assert!(traits.supports_stop && traits.supports_position && traits.supports_toggle);
    assert!(!traits.supports_tilt && !traits.is_assumed_state);
}
