//! Integration tests for the command queue → AppService → scheduler →
//! actuator pipeline, with the program persisted through `ProgramStore`.
//!
//! These run on the host (x86_64) without any real hardware.

use irrigation::adapters::nvs::NAMESPACE;
use irrigation::adapters::program_store::{ProgramStore, STEPS_KEY};
use irrigation::app::commands::{AppCommand, CommandResponse};
use irrigation::app::events::AppEvent;
use irrigation::app::ports::{StepStorePort, StoragePort, WallTime};
use irrigation::app::service::AppService;
use irrigation::config::{SystemConfig, default_program};
use irrigation::events::{self, CommandQueue};
use irrigation::fsm::StateId;
use irrigation::program::{StepDefinition, ValveMask};

use crate::mock_hw::{MockHardware, MockNvs, RecordingSink};

type App = AppService<MockHardware>;

fn make_app() -> (App, ProgramStore<MockNvs>, RecordingSink) {
    let store = ProgramStore::new(MockNvs::new());
    let mut app = AppService::new(SystemConfig::default(), MockHardware::new(), store.load_all());
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    (app, store, sink)
}

fn mask(text: &str) -> ValveMask {
    text.parse().unwrap()
}

// ── Command queue dispatch ────────────────────────────────────

#[test]
fn queued_commands_are_handled_in_order() {
    let (mut app, mut store, mut sink) = make_app();
    let mut queue = CommandQueue::new();
    let (mut tx, mut rx) = queue.split();
    assert!(events::push_command(&mut tx, AppCommand::StartProgram));
    assert!(events::push_command(&mut tx, AppCommand::StartProgram));
    assert!(events::push_command(&mut tx, AppCommand::GetStatus));

    let mut responses: Vec<CommandResponse> = Vec::new();
    events::drain_commands(&mut rx, |cmd| {
        responses.push(app.handle_command(cmd, &mut store, &mut sink));
    });

    let summary: Vec<_> = responses
        .iter()
        .map(|r| (r.command, r.success, r.message.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("start", true, "program started"),
            ("start", false, "already running"),
            ("status", true, "Waiting for pump"),
        ]
    );
    assert_eq!(app.state(), StateId::AwaitingPump);
    assert!(app.scheduler().gateway().pump_on());
}

#[test]
fn stop_when_idle_is_rejected() {
    let (mut app, mut store, mut sink) = make_app();
    let r = app.handle_command(AppCommand::StopProgram, &mut store, &mut sink);
    assert!(!r.success);
    assert_eq!(r.message.as_str(), "not running");
}

#[test]
fn invalid_schedule_is_rejected_and_not_persisted() {
    let (mut app, mut store, mut sink) = make_app();
    let r = app.handle_command(
        AppCommand::SetSchedule { hour: 24, minute: 0 },
        &mut store,
        &mut sink,
    );
    assert!(!r.success);
    assert_eq!(r.message.as_str(), "schedule: hour 24 out of range");
    assert_eq!(store.load_all().schedule, default_program().schedule);
}

// ── Full run through the service ──────────────────────────────

#[test]
fn scheduled_run_emits_step_and_finish_events() {
    let (mut app, _store, mut sink) = make_app();
    for minute in 0..120 {
        let t = 19 * 60 + 50 + minute;
        app.tick(WallTime::new((t / 60) as u8, (t % 60) as u8), &mut sink);
    }

    let started: Vec<usize> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StepStarted { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![0, 1, 2, 3]);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ProgramFinished)), 1);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::StateChanged { from: StateId::Idle, to: StateId::AwaitingPump }
        )),
        1
    );
    assert_eq!(app.state(), StateId::Idle);
}

#[test]
fn stop_mid_run_shuts_everything() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::StartProgram, &mut store, &mut sink);
    app.tick(WallTime::new(12, 0), &mut sink);
    assert_eq!(app.state(), StateId::Running);

    let r = app.handle_command(AppCommand::StopProgram, &mut store, &mut sink);
    assert!(r.success);
    let hw = app.scheduler().gateway();
    assert!(!hw.pump_on());
    assert!(hw.valves().is_closed());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ProgramFinished)), 1);
}

// ── Manual overrides ──────────────────────────────────────────

#[test]
fn timed_manual_valves_close_after_duration() {
    let (mut app, mut store, mut sink) = make_app();
    let r = app.handle_command(
        AppCommand::ValveControl {
            valves: mask("xxx oxx xxx xxx"),
            duration_minutes: 3,
        },
        &mut store,
        &mut sink,
    );
    assert_eq!(r.message.as_str(), "xxx oxx xxx xxx open for 3 min");
    assert_eq!(app.scheduler().gateway().valves(), mask("xxx oxx xxx xxx"));

    app.tick(WallTime::new(10, 0), &mut sink);
    app.tick(WallTime::new(10, 1), &mut sink);
    assert_eq!(app.manual_minutes_remaining(), Some(1));
    assert!(!app.scheduler().gateway().valves().is_closed());

    app.tick(WallTime::new(10, 2), &mut sink);
    assert_eq!(app.manual_minutes_remaining(), None);
    assert!(app.scheduler().gateway().valves().is_closed());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ManualValvesClosed)), 1);
}

#[test]
fn manual_valves_stop_a_running_program() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::StartProgram, &mut store, &mut sink);
    app.tick(WallTime::new(12, 0), &mut sink);
    assert!(app.scheduler().is_running());

    app.handle_command(
        AppCommand::ValveControl {
            valves: mask("oxx xxx xxx xxx"),
            duration_minutes: 5,
        },
        &mut store,
        &mut sink,
    );
    assert_eq!(app.state(), StateId::Idle);
    assert!(!app.scheduler().gateway().pump_on());
    assert_eq!(app.scheduler().gateway().valves(), mask("oxx xxx xxx xxx"));
}

#[test]
fn scheduled_start_cancels_manual_countdown() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(
        AppCommand::ValveControl {
            valves: mask("xxx xxx xxx xxo"),
            duration_minutes: 30,
        },
        &mut store,
        &mut sink,
    );
    app.tick(WallTime::new(19, 59), &mut sink);
    assert_eq!(app.manual_minutes_remaining(), Some(29));

    app.tick(WallTime::new(20, 0), &mut sink);
    assert_eq!(app.state(), StateId::AwaitingPump);
    assert_eq!(app.manual_minutes_remaining(), None);
}

#[test]
fn scheduled_start_closes_manual_valves_while_pump_warms_up() {
    let mut store = ProgramStore::new(MockNvs::new());
    let mut app = AppService::new(SystemConfig::default(), MockHardware::dead_pump(), store.load_all());
    let mut sink = RecordingSink::new();
    app.handle_command(
        AppCommand::ValveControl {
            valves: mask("ooo oxx xxx xxx"),
            duration_minutes: 30,
        },
        &mut store,
        &mut sink,
    );
    app.tick(WallTime::new(19, 59), &mut sink);
    assert!(!app.scheduler().gateway().valves().is_closed());

    app.tick(WallTime::new(20, 0), &mut sink);
    for minute in 1..=5 {
        app.tick(WallTime::new(20, minute), &mut sink);
        assert_eq!(app.state(), StateId::AwaitingPump);
        assert_eq!(app.scheduler().gateway().valves(), ValveMask::CLOSED);
    }
    assert_eq!(app.manual_minutes_remaining(), None);
    assert!(app.scheduler().gateway().pump_on());
}

#[test]
fn start_program_closes_manual_valves() {
    let mut store = ProgramStore::new(MockNvs::new());
    let mut app = AppService::new(SystemConfig::default(), MockHardware::dead_pump(), store.load_all());
    let mut sink = RecordingSink::new();
    app.handle_command(
        AppCommand::ValveControl {
            valves: mask("xxo oxx xxx xxx"),
            duration_minutes: 10,
        },
        &mut store,
        &mut sink,
    );

    let r = app.handle_command(AppCommand::StartProgram, &mut store, &mut sink);
    assert!(r.success);
    assert_eq!(app.scheduler().gateway().valves(), ValveMask::CLOSED);
    assert_eq!(app.manual_minutes_remaining(), None);

    app.tick(WallTime::new(9, 0), &mut sink);
    assert_eq!(app.state(), StateId::AwaitingPump);
    assert_eq!(app.scheduler().gateway().valves(), ValveMask::CLOSED);
}

#[test]
fn status_reports_pump_on_only_after_warmup() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::PumpControl { on: true }, &mut store, &mut sink);
    assert!(app.scheduler().gateway().pump_on());
    assert!(!app.status().pump_on);

    app.tick(WallTime::new(20, 0), &mut sink);
    assert_eq!(app.state(), StateId::AwaitingPump);
    assert!(!app.status().pump_on);

    app.tick(WallTime::new(20, 1), &mut sink);
    assert_eq!(app.state(), StateId::Running);
    assert!(app.status().pump_on);
}

#[test]
fn manual_pump_toggles() {
    let (mut app, mut store, mut sink) = make_app();
    let r = app.handle_command(AppCommand::PumpControl { on: true }, &mut store, &mut sink);
    assert_eq!(r.message.as_str(), "pump on");
    assert!(app.scheduler().gateway().pump_on());
    app.handle_command(AppCommand::PumpControl { on: false }, &mut store, &mut sink);
    assert!(!app.scheduler().gateway().pump_on());
}

// ── Program editing and persistence ───────────────────────────

#[test]
fn edited_program_survives_reboot() {
    let (mut app, mut store, mut sink) = make_app();
    let step = StepDefinition::new(mask("ooo ooo xxx xxx"), 8);
    let r = app.handle_command(
        AppCommand::SetStep { index: 4, step: Some(step) },
        &mut store,
        &mut sink,
    );
    assert_eq!(r.message.as_str(), "step 5 set");
    let r = app.handle_command(
        AppCommand::SetSchedule { hour: 5, minute: 45 },
        &mut store,
        &mut sink,
    );
    assert_eq!(r.message.as_str(), "daily start at 05:45");

    // New service over the same store, as after a power cycle.
    let rebooted = AppService::new(SystemConfig::default(), MockHardware::new(), store.load_all());
    let program = rebooted.scheduler().program();
    assert_eq!(program.schedule.to_string(), "05:45");
    assert_eq!(program.steps.get(4), Some(&step));
    assert_eq!(program.steps.len(), 5);
}

#[test]
fn cleared_step_truncates_the_run() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::SetStep { index: 1, step: None }, &mut store, &mut sink);

    app.handle_command(AppCommand::StartProgram, &mut store, &mut sink);
    for minute in 0..40 {
        app.tick(WallTime::new(12, minute), &mut sink);
    }
    assert_eq!(app.scheduler().gateway().opened_masks(), vec![0x005]);
    assert_eq!(app.state(), StateId::Idle);
}

#[test]
fn write_failure_keeps_change_in_memory() {
    let mut nvs = MockNvs::new();
    nvs.fail_writes = true;
    let mut store = ProgramStore::new(nvs);
    let mut app = AppService::new(SystemConfig::default(), MockHardware::new(), store.load_all());
    let mut sink = RecordingSink::new();

    let r = app.handle_command(
        AppCommand::SetSchedule { hour: 7, minute: 0 },
        &mut store,
        &mut sink,
    );
    assert!(r.success);
    assert_eq!(r.message.as_str(), "daily start at 07:00 (not persisted)");
    assert_eq!(app.scheduler().next_scheduled_time().to_string(), "07:00");
    assert_eq!(store.load_all().schedule.to_string(), "20:00");
}

#[test]
fn step_edit_over_corrupt_blob_persists_running_program() {
    let (mut app, mut store, mut sink) = make_app();
    let mut custom = default_program();
    custom.steps.set(3, None).unwrap();
    app.handle_command(AppCommand::SetStep { index: 3, step: None }, &mut store, &mut sink);
    store
        .storage_mut()
        .write(NAMESPACE, STEPS_KEY, &[0xFF; 4])
        .unwrap();

    let step = StepDefinition::new(mask("xxx xxx xxx oxx"), 6);
    custom.steps.set(0, Some(step)).unwrap();
    let r = app.handle_command(
        AppCommand::SetStep { index: 0, step: Some(step) },
        &mut store,
        &mut sink,
    );
    assert_eq!(r.message.as_str(), "step 1 set");
    assert_eq!(app.scheduler().program().steps, custom.steps);
    assert_eq!(store.load_all().steps, custom.steps);
}

#[test]
fn reload_replaces_in_memory_program() {
    let (mut app, mut store, mut sink) = make_app();
    // Edit persisted program behind the service's back.
    let mut steps = default_program().steps;
    steps
        .set(0, Some(StepDefinition::new(mask("xxx xxx xxx xxo"), 2)))
        .unwrap();
    store.save_step(0, &steps).unwrap();
    assert_eq!(app.scheduler().program(), default_program());

    let r = app.handle_command(AppCommand::ReloadProgram, &mut store, &mut sink);
    assert_eq!(r.message.as_str(), "4 steps daily at 20:00");
    assert_eq!(
        app.scheduler().program().steps.get(0).map(|s| s.valves),
        Some(mask("xxx xxx xxx xxo"))
    );
}

// ── Config and restart ────────────────────────────────────────

#[test]
fn update_config_marks_dirty_until_saved() {
    let (mut app, mut store, mut sink) = make_app();
    assert!(!app.is_config_dirty());

    let cfg = SystemConfig {
        pump_wait_timeout_minutes: Some(15),
        ..SystemConfig::default()
    };
    let r = app.handle_command(AppCommand::UpdateConfig(cfg), &mut store, &mut sink);
    assert!(r.success);
    assert!(app.is_config_dirty());

    assert!(app.save_config_if_dirty(store.storage()));
    assert!(!app.is_config_dirty());
    assert!(!app.save_config_if_dirty(store.storage()));
    assert_eq!(app.current_config(), cfg);
}

#[test]
fn restart_delay_is_clamped() {
    let (mut app, mut store, mut sink) = make_app();
    let r = app.handle_command(AppCommand::Restart { delay_secs: 0 }, &mut store, &mut sink);
    assert_eq!(r.restart_in_secs, Some(1));
    let r = app.handle_command(AppCommand::Restart { delay_secs: 200 }, &mut store, &mut sink);
    assert_eq!(r.restart_in_secs, Some(60));
    assert_eq!(r.message.as_str(), "restarting in 60 s");
}

#[test]
fn restart_stops_running_program() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::StartProgram, &mut store, &mut sink);
    app.handle_command(AppCommand::Restart { delay_secs: 5 }, &mut store, &mut sink);
    assert_eq!(app.state(), StateId::Idle);
    assert!(!app.scheduler().gateway().pump_on());
}

#[test]
fn restart_switches_manual_outputs_off() {
    let (mut app, mut store, mut sink) = make_app();
    app.handle_command(AppCommand::PumpControl { on: true }, &mut store, &mut sink);
    app.handle_command(
        AppCommand::ValveControl {
            valves: mask("oxo xxx xxx xxx"),
            duration_minutes: 20,
        },
        &mut store,
        &mut sink,
    );
    // Idle, so the valve command leaves the pump on.
    assert!(app.scheduler().gateway().pump_on());

    app.handle_command(AppCommand::Restart { delay_secs: 3 }, &mut store, &mut sink);
    assert!(!app.scheduler().gateway().pump_on());
    assert_eq!(app.scheduler().gateway().valves(), ValveMask::CLOSED);
    assert_eq!(app.manual_minutes_remaining(), None);
}
