//! Integration tests for a single end device driven through the engine.

mod common;

use capsim::devices::{EnergyNotification, PhyState, TracePoint};
use capsim::sim::clock::SimTime;

use common::VS;

fn states_of(points: &[(usize, TracePoint)], device: usize) -> Vec<PhyState> {
    points
        .iter()
        .filter(|(d, _)| *d == device)
        .filter_map(|(_, p)| match p {
            TracePoint::State { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}

fn notifications_of(points: &[(usize, TracePoint)]) -> Vec<EnergyNotification> {
    points
        .iter()
        .filter_map(|(_, p)| match p {
            TracePoint::Notification { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[test]
fn depletion_switches_off_and_recharge_turns_back_on() {
    let mut engine = common::engine(10.0, vec![common::device(0, 1.9, 0.05, false)]);
    engine.start().ok();
    let started = engine
        .act_on(0, |d, s| d.request_transition(PhyState::Tx, Some(14.0), s))
        .unwrap_or(false);
    assert!(started);

    engine.run().ok();
    let dev = &engine.devices()[0];
    assert_eq!(dev.stats().depletions, 1);
    assert_eq!(dev.stats().recharges, 1);
    assert_eq!(dev.state(), PhyState::Sleep);
    assert_eq!(dev.radio().current_state(), PhyState::Sleep);

    let points = engine.recorder().points();
    assert_eq!(
        states_of(points, 0),
        vec![PhyState::Tx, PhyState::Off, PhyState::TurnOn, PhyState::Sleep]
    );
    assert_eq!(
        notifications_of(points),
        vec![EnergyNotification::Drained, EnergyNotification::Recharged]
    );
}

#[test]
fn sleep_policy_never_switches_off() {
    let mut engine = common::engine(10.0, vec![common::device(0, 1.9, 0.05, true)]);
    engine.start().ok();
    engine
        .act_on(0, |d, s| d.request_transition(PhyState::Tx, Some(14.0), s))
        .ok();
    engine.run().ok();

    let dev = &engine.devices()[0];
    assert_eq!(dev.stats().depletions, 1);
    assert_eq!(dev.stats().recharges, 1);
    assert_eq!(
        states_of(engine.recorder().points(), 0),
        vec![PhyState::Tx, PhyState::Sleep]
    );
}

#[test]
fn depleted_device_refuses_active_states() {
    let mut engine = common::engine(5.0, vec![common::device(0, 1.0, 0.0, false)]);
    engine.start().ok();
    assert_eq!(engine.devices()[0].state(), PhyState::Off);

    for target in [PhyState::Tx, PhyState::Rx, PhyState::Standby, PhyState::Idle] {
        let ok = engine
            .act_on(0, |d, s| d.request_transition(target, None, s))
            .unwrap_or(true);
        assert!(!ok, "{target} should be refused");
        assert_eq!(engine.devices()[0].state(), PhyState::Off);
    }
    assert_eq!(engine.devices()[0].stats().transitions_refused, 4);
}

#[test]
fn every_transition_lands_in_a_defined_state() {
    for sleep_policy in [false, true] {
        for v0 in [VS, 1.0] {
            for first in PhyState::ALL {
                for target in PhyState::ALL {
                    let mut engine =
                        common::engine(1.0, vec![common::device(0, v0, 0.0, sleep_policy)]);
                    engine.start().ok();
                    engine
                        .act_on(0, |d, s| d.request_transition(first, None, s))
                        .ok();
                    engine.run_until(SimTime::from_secs_f64(0.01)).ok();
                    let before = engine.devices()[0].state();

                    let ok = engine
                        .act_on(0, |d, s| d.request_transition(target, None, s))
                        .unwrap_or(false);
                    let dev = &engine.devices()[0];
                    let after = dev.state();

                    assert_eq!(dev.radio().current_state(), after);
                    if ok {
                        assert_eq!(after, target);
                    } else {
                        assert!(
                            after == before || after == PhyState::Sleep || after == PhyState::Off,
                            "{first} -> {target} left the device in {after}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn consumption_never_exceeds_energy_drawn_without_harvest() {
    let mut engine = common::engine(30.0, vec![common::device(0, VS, 0.0, false)]);
    engine.start().ok();
    let steps = [
        (PhyState::Tx, 0.5),
        (PhyState::Standby, 2.0),
        (PhyState::Rx, 3.0),
        (PhyState::Sleep, 5.0),
    ];
    for (state, at) in steps {
        engine.run_until(SimTime::from_secs_f64(at)).ok();
        engine
            .act_on(0, |d, s| d.request_transition(state, None, s))
            .ok();
    }
    engine.run().ok();

    let dev = &engine.devices()[0];
    let drawn = dev.source().initial_energy_j() - dev.source().remaining_energy_j();
    let consumed = dev.total_energy_consumption_j();
    assert!(consumed > 0.0);
    assert!(consumed <= drawn + 1e-12, "consumed {consumed} J > drawn {drawn} J");
}

#[test]
fn voltage_trace_is_timestamped_in_order() {
    let mut engine = common::engine(20.0, vec![common::device(0, VS, 0.001, false)]);
    engine.run().ok();
    let times: Vec<f64> = engine
        .recorder()
        .for_device(0)
        .filter(|p| matches!(p, TracePoint::Voltage { .. }))
        .map(|p| p.time().as_secs_f64())
        .collect();
    assert!(times.len() >= 20);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(times.last().copied(), Some(20.0));
}
