#![forbid(unsafe_code)]

//! Deterministic timing tests for the roll controller.
//!
//! Every test drives a [`RollController`] through the virtual-time
//! [`Simulator`], so "the result arrives 300ms in" is exact. The fetch task
//! is parked until the test calls `run_tasks()`, which is how a response
//! latency is modelled.
//!
//! Run:
//!   cargo test -p dice-roll --test controller_timing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dice_core::{Face, FaceOrientationTable, Rotation};
use dice_roll::{
    EventLog, FetchError, Phase, RollConfig, RollController, RollEvent, RollMsg, SessionOutcome,
};
use dice_runtime::{ManualClock, Simulator};

type Sim = Simulator<RollController<EventLog>>;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn face(v: i64) -> Face {
    Face::new(v).unwrap()
}

/// Fetcher that answers from a fixed script, then fails.
fn scripted(
    results: Vec<Result<Face, FetchError>>,
) -> impl Fn() -> Result<Face, FetchError> + Send + Sync + 'static {
    let queue = Mutex::new(VecDeque::from(results));
    move || {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("script exhausted".into())))
    }
}

fn sim(results: Vec<Result<Face, FetchError>>) -> (Sim, EventLog) {
    sim_with_config(&RollConfig::default(), results)
}

fn sim_with_config(config: &RollConfig, results: Vec<Result<Face, FetchError>>) -> (Sim, EventLog) {
    let clock = ManualClock::new();
    let log = EventLog::new();
    let controller = RollController::new(config, Arc::new(scripted(results)), Arc::new(clock.clone()))
        .with_seed(0x5eed)
        .with_observer(log.clone());
    (Simulator::new(controller, clock), log)
}

fn committed_at(log: &EventLog, session: u64) -> Option<u64> {
    log.for_session(session).iter().find_map(|e| match e {
        RollEvent::Committed { at_ms, .. } => Some(*at_ms),
        _ => None,
    })
}

fn rotated_times(log: &EventLog, session: u64) -> Vec<u64> {
    log.for_session(session)
        .iter()
        .filter(|e| matches!(e, RollEvent::Rotated { .. }))
        .map(RollEvent::at_ms)
        .collect()
}

fn trigger_changes(log: &EventLog) -> Vec<(bool, String, u64)> {
    log.snapshot()
        .into_iter()
        .filter_map(|e| match e {
            RollEvent::TriggerChanged {
                enabled,
                label,
                at_ms,
            } => Some((enabled, label, at_ms)),
            _ => None,
        })
        .collect()
}

fn assert_forward_only(log: &EventLog) {
    let mut last = Rotation::ZERO;
    for event in log.snapshot() {
        if let Some(rotation) = event.rotation() {
            assert!(
                rotation.is_forward_of(&last),
                "rotation went backwards: {last} -> {rotation} at {event:?}"
            );
            last = rotation;
        }
    }
}

// ── 1. Commit gate ──

#[test]
fn fast_result_waits_for_minimum_spin() {
    let (mut sim, log) = sim(vec![Ok(face(4))]);
    sim.send(RollMsg::Begin);
    sim.advance(ms(300));
    sim.run_tasks();

    assert_eq!(sim.model().phase(), Phase::Settling);
    assert_eq!(sim.model().confirmed_face(), Face::ONE);

    sim.advance_to(ms(999));
    assert_eq!(committed_at(&log, 1), None);

    sim.advance_to(ms(1000));
    assert_eq!(committed_at(&log, 1), Some(1000));
    let c = sim.model();
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.confirmed_face(), face(4));
    assert_eq!(c.table().face_at(c.rotation()), Some(face(4)));
}

#[test]
fn slow_result_commits_on_arrival() {
    let (mut sim, log) = sim(vec![Ok(face(2))]);
    sim.send(RollMsg::Begin);
    sim.advance_to(ms(1500));
    assert_eq!(sim.model().phase(), Phase::Spinning);

    sim.run_tasks();
    assert_eq!(committed_at(&log, 1), Some(1500));
    assert_eq!(sim.model().confirmed_face(), face(2));
}

#[test]
fn result_at_exact_minimum_commits_once() {
    let (mut sim, log) = sim(vec![Ok(face(6))]);
    sim.send(RollMsg::Begin);
    sim.advance(ms(1000));
    sim.run_tasks();
    let ends: Vec<_> = log
        .for_session(1)
        .into_iter()
        .filter(|e| matches!(e, RollEvent::SessionEnded { .. }))
        .collect();
    assert_eq!(ends.len(), 1);
    assert_eq!(committed_at(&log, 1), Some(1000));
}

#[test]
fn commit_adds_one_or_two_revolutions() {
    let (mut sim, log) = sim(vec![Ok(face(3))]);
    sim.send(RollMsg::Begin);
    sim.advance(ms(100));
    sim.run_tasks();
    sim.advance_to(ms(1000));
    let after = sim.model().rotation();
    let before = log
        .for_session(1)
        .iter()
        .filter(|e| matches!(e, RollEvent::Rotated { .. }))
        .filter_map(RollEvent::rotation)
        .last()
        .unwrap();

    let extra = log
        .for_session(1)
        .iter()
        .find_map(|e| match e {
            RollEvent::Committed { extra_spins, .. } => Some(*extra_spins),
            _ => None,
        })
        .unwrap();
    assert!((1..=2).contains(&extra));
    let floor = i64::from(extra) * 360;
    assert!(after.x >= before.x + floor);
    assert!(after.y >= before.y + floor);
    assert!(after.x < before.x + floor + 360);
    assert!(after.y < before.y + floor + 360);
}

// ── 2. Orientation ──

#[test]
fn every_face_commits_to_its_orientation() {
    let faces: Vec<_> = Face::ALL.iter().copied().map(Ok).collect();
    let (mut sim, log) = sim(faces);
    let table = FaceOrientationTable::standard();

    for (i, expected) in Face::ALL.iter().enumerate() {
        sim.send(RollMsg::Begin);
        sim.advance(ms(50));
        sim.run_tasks();
        sim.advance(ms(1950));

        let session = i as u64 + 1;
        let committed = log
            .for_session(session)
            .into_iter()
            .find_map(|e| match e {
                RollEvent::Committed { face, rotation, .. } => Some((face, rotation)),
                _ => None,
            })
            .unwrap();
        assert_eq!(committed.0, *expected);
        assert_eq!(table.face_at(committed.1), Some(*expected));
        assert!(sim.model().trigger().enabled);
    }
    assert_forward_only(&log);
}

// ── 3. Failure ──

#[test]
fn failure_reverts_to_last_confirmed_face() {
    let (mut sim, log) = sim(vec![Ok(face(5)), Err(FetchError::Status(500))]);

    sim.send(RollMsg::Begin);
    sim.advance(ms(10));
    sim.run_tasks();
    sim.advance_to(ms(2000));
    assert_eq!(sim.model().confirmed_face(), face(5));

    sim.send(RollMsg::Begin);
    sim.advance(ms(100));
    sim.run_tasks();

    let c = sim.model();
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(c.confirmed_face(), face(5));
    assert_eq!(c.table().face_at(c.rotation()), Some(face(5)));
    assert_eq!(c.active_session(), None);

    let events = log.for_session(2);
    assert!(matches!(
        events.last(),
        Some(RollEvent::SessionEnded {
            outcome: SessionOutcome::Reverted,
            at_ms: 2100,
            ..
        })
    ));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, RollEvent::Reverted { face: f, .. } if *f == face(5)))
    );
    assert_forward_only(&log);
}

#[test]
fn failure_cancels_spin_and_minimum_timer() {
    let (mut sim, log) = sim(vec![Err(FetchError::Transport("refused".into()))]);
    sim.send(RollMsg::Begin);
    sim.run_tasks();
    // Only the cooldown remains armed.
    assert_eq!(sim.pending_timers(), 1);
    assert_eq!(sim.next_deadline(), Some(ms(2000)));

    let rotated_before = rotated_times(&log, 1).len();
    sim.advance_to(ms(1500));
    assert_eq!(rotated_times(&log, 1).len(), rotated_before);
    assert_eq!(committed_at(&log, 1), None);
}

#[test]
fn failure_does_not_re_enable_trigger_early() {
    let (mut sim, log) = sim(vec![Err(FetchError::Status(503))]);
    sim.send(RollMsg::Begin);
    sim.run_tasks();
    assert!(!sim.model().trigger().enabled);

    sim.advance_to(ms(1999));
    assert!(!sim.model().trigger().enabled);
    sim.advance_to(ms(2000));
    assert!(sim.model().trigger().enabled);
    assert_eq!(
        trigger_changes(&log),
        vec![
            (false, "Rolling...".to_string(), 0),
            (true, "Roll".to_string(), 2000),
        ]
    );
}

#[test]
fn invalid_payload_is_treated_like_any_failure() {
    let bad = dice_roll::parse_payload("7").unwrap_err();
    let (mut sim, _log) = sim(vec![Err(bad)]);
    sim.send(RollMsg::Begin);
    sim.run_tasks();
    assert_eq!(sim.model().confirmed_face(), Face::ONE);
    assert_eq!(sim.model().phase(), Phase::Idle);
}

// ── 4. Spin cadence ──

#[test]
fn spin_ticks_decelerate_from_first_frame() {
    let (mut sim, log) = sim(vec![Ok(face(1))]);
    sim.send(RollMsg::Begin);
    sim.advance_to(ms(1000));
    assert_eq!(
        rotated_times(&log, 1),
        vec![0, 60, 140, 240, 360, 500, 660, 840]
    );
}

#[test]
fn hung_request_keeps_spinning_at_max_delay() {
    let (mut sim, log) = sim(vec![Ok(face(1))]);
    sim.send(RollMsg::Begin);
    sim.advance_to(ms(10_000));

    assert_eq!(sim.model().phase(), Phase::Spinning);
    assert!(sim.model().trigger().enabled);
    let times = rotated_times(&log, 1);
    let tail: Vec<u64> = times.windows(2).rev().take(5).map(|w| w[1] - w[0]).collect();
    assert_eq!(tail, vec![240; 5]);
    assert_forward_only(&log);
}

// ── 5. Cooldown ──

#[test]
fn trigger_re_enables_at_exact_cooldown() {
    let (mut sim, log) = sim(vec![Ok(face(2))]);
    sim.send(RollMsg::Begin);
    sim.run_tasks();
    sim.advance_to(ms(1999));
    assert!(!sim.model().trigger().enabled);
    assert_eq!(sim.model().trigger().label, "Rolling...");

    sim.advance_to(ms(2000));
    assert!(sim.model().trigger().enabled);
    assert_eq!(sim.model().trigger().label, "Roll");
    assert_eq!(trigger_changes(&log).last().map(|t| t.2), Some(2000));
}

#[test]
fn cooldown_is_independent_of_slow_animation() {
    let mut config = RollConfig::default();
    config.timing.min_spin_duration_ms = 3000;
    let (mut sim, log) = sim_with_config(&config, vec![Ok(face(3))]);
    sim.send(RollMsg::Begin);
    sim.run_tasks();
    sim.advance_to(ms(2000));
    assert!(sim.model().trigger().enabled);
    assert_eq!(sim.model().phase(), Phase::Settling);
    sim.advance_to(ms(3000));
    assert_eq!(committed_at(&log, 1), Some(3000));
}

#[test]
fn custom_labels_are_used() {
    let mut config = RollConfig::default();
    config.trigger.idle_label = "Throw".into();
    config.trigger.rolling_label = "Tumbling".into();
    let (mut sim, _log) = sim_with_config(&config, vec![Ok(face(3))]);
    assert_eq!(sim.model().trigger().label, "Throw");
    sim.send(RollMsg::Begin);
    assert_eq!(sim.model().trigger().label, "Tumbling");
}

// ── 6. Supersede ──

#[test]
fn new_roll_cancels_previous_session_work() {
    let (mut sim, log) = sim(vec![Ok(face(2)), Ok(face(6))]);
    sim.send(RollMsg::Begin);
    // Session 1's fetch never completes before the cooldown.
    sim.advance_to(ms(2000));
    assert_eq!(sim.model().phase(), Phase::Spinning);
    assert!(sim.model().trigger().enabled);

    sim.send(RollMsg::Begin);
    assert_eq!(sim.model().active_session(), Some(2));
    assert_eq!(sim.pending_tasks(), 2);

    // Runs the stale session 1 task too; its answer is discarded.
    sim.run_tasks();
    sim.advance_to(ms(4000));

    let s1 = log.for_session(1);
    assert!(matches!(
        s1.last(),
        Some(RollEvent::SessionEnded {
            outcome: SessionOutcome::Superseded,
            at_ms: 2000,
            ..
        })
    ));
    assert!(s1.iter().all(|e| e.at_ms() <= 2000));
    assert!(!s1.iter().any(|e| matches!(e, RollEvent::Committed { .. })));

    // The first scripted answer was consumed by the stale task.
    assert_eq!(sim.model().confirmed_face(), face(6));
    assert_eq!(committed_at(&log, 2), Some(3000));
    assert_forward_only(&log);
}
