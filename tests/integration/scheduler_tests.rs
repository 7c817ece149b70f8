//! Scheduler driven by a simulated wall clock, minute by minute.
//!
//! Uses the factory program and the recording mock gateway; checks when
//! each effect lands on the clock and that one run happens per day.

use irrigation::config::default_program;
use irrigation::fsm::StateId;
use irrigation::fsm::context::Effect;
use irrigation::program::ValveMask;
use irrigation::scheduler::Scheduler;

use crate::mock_hw::{ActuatorCall, MockHardware};

/// Minute-of-day → (hour, minute).
fn hm(minute_of_day: u32) -> (u8, u8) {
    let m = minute_of_day % (24 * 60);
    ((m / 60) as u8, (m % 60) as u8)
}

fn at(h: u32, m: u32) -> u32 {
    h * 60 + m
}

/// Tick every minute in `[from, to)` and collect (clock, effect) pairs.
fn run_clock(
    s: &mut Scheduler<MockHardware>,
    from: u32,
    to: u32,
) -> Vec<((u8, u8), Effect)> {
    let mut out = Vec::new();
    for minute in from..to {
        let (h, m) = hm(minute);
        if let Some(effect) = s.tick(h, m) {
            out.push(((h, m), effect));
        }
    }
    out
}

#[test]
fn factory_program_evening_timeline() {
    let mut s = Scheduler::new(MockHardware::new(), default_program(), None);
    let effects = run_clock(&mut s, at(19, 50), at(21, 30));

    assert_eq!(
        effects,
        vec![
            ((20, 0), Effect::PumpOn),
            ((20, 1), Effect::ValveMask(ValveMask::new(0x005))),
            ((20, 20), Effect::ValveMask(ValveMask::new(0x402))),
            ((20, 36), Effect::ValveMask(ValveMask::new(0x0C0))),
            ((20, 50), Effect::ValveMask(ValveMask::new(0xA00))),
            ((21, 4), Effect::AllOff),
        ]
    );
    assert_eq!(s.state(), StateId::Idle);
    assert!(!s.gateway().pump_on());
    assert!(s.gateway().valves().is_closed());
}

#[test]
fn valves_are_cleared_before_each_new_mask() {
    let mut s = Scheduler::new(MockHardware::new(), default_program(), None);
    run_clock(&mut s, at(20, 0), at(21, 10));

    let calls = &s.gateway().calls;
    for (i, call) in calls.iter().enumerate() {
        if let ActuatorCall::Valves(bits) = call {
            if *bits != 0 {
                assert_eq!(calls[i - 1], ActuatorCall::Valves(0), "mask {bits:#05x} not preceded by clear");
            }
        }
    }
    assert_eq!(s.gateway().opened_masks(), vec![0x005, 0x402, 0x0C0, 0xA00]);
}

#[test]
fn runs_once_per_day() {
    let mut s = Scheduler::new(MockHardware::new(), default_program(), None);
    let effects = run_clock(&mut s, at(0, 0), 3 * 24 * 60);
    let starts = effects
        .iter()
        .filter(|(_, e)| *e == Effect::PumpOn)
        .count();
    assert_eq!(starts, 3);
}

#[test]
fn pump_warmup_delays_first_step() {
    let mut s = Scheduler::new(MockHardware::with_warmup(4), default_program(), None);
    let effects = run_clock(&mut s, at(20, 0), at(20, 10));
    assert_eq!(
        effects,
        vec![
            ((20, 0), Effect::PumpOn),
            ((20, 5), Effect::ValveMask(ValveMask::new(0x005))),
        ]
    );
    assert_eq!(s.status_line().as_str(), "Step 1/4: 16 min left");
}

#[test]
fn dead_pump_times_out_and_shuts_down() {
    let mut s = Scheduler::new(MockHardware::dead_pump(), default_program(), Some(10));
    let effects = run_clock(&mut s, at(20, 0), at(20, 30));
    assert_eq!(effects.first(), Some(&((20, 0), Effect::PumpOn)));
    assert_eq!(effects.last().map(|(_, e)| *e), Some(Effect::AllOff));
    assert!(s.gateway().opened_masks().is_empty());
    assert_eq!(s.state(), StateId::Idle);
}

#[test]
fn dead_pump_without_timeout_waits_all_night() {
    let mut s = Scheduler::new(MockHardware::dead_pump(), default_program(), None);
    run_clock(&mut s, at(20, 0), at(23, 59));
    assert_eq!(s.state(), StateId::AwaitingPump);
    assert_eq!(s.status_line().as_str(), "Waiting for pump");
    assert!(s.gateway().opened_masks().is_empty());
}

#[test]
fn rescheduling_mid_day_moves_the_run() {
    let mut s = Scheduler::new(MockHardware::new(), default_program(), None);
    s.set_schedule(6, 30).unwrap();
    let effects = run_clock(&mut s, at(6, 0), at(21, 0));
    assert_eq!(effects.first(), Some(&((6, 30), Effect::PumpOn)));
    assert!(effects.iter().all(|((h, _), _)| *h < 20));
}
