//! Fuzz target: command / tick interleavings against `AppService`
//!
//! Decodes the input into a sequence of clock ticks and commands and
//! verifies after every operation:
//! - No panics
//! - The pump is on whenever a run is in progress
//! - Valves stay closed while waiting for the pump
//! - An idle scheduler reports no active step and zero minutes remaining
//!
//! cargo fuzz run fuzz_command_sequence

#![no_main]

use libfuzzer_sys::fuzz_target;
use irrigation::app::commands::AppCommand;
use irrigation::app::events::AppEvent;
use irrigation::app::ports::{ActuatorPort, EventSink, StepStorePort, StorageError, WallTime};
use irrigation::app::service::AppService;
use irrigation::config::{SystemConfig, default_program};
use irrigation::fsm::StateId;
use irrigation::program::{ProgramSnapshot, ScheduleTime, StepDefinition, StepList, ValveMask};

struct Gateway {
    valves: ValveMask,
    pump: bool,
}

impl ActuatorPort for Gateway {
    fn set_valve_mask(&mut self, mask: ValveMask) {
        self.valves = mask;
    }

    fn set_pump(&mut self, on: bool) {
        self.pump = on;
    }

    fn is_pump_ready(&self) -> bool {
        self.pump
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

struct MemProgram(ProgramSnapshot);

impl StepStorePort for MemProgram {
    fn load_all(&self) -> ProgramSnapshot {
        self.0
    }

    fn save_schedule(&mut self, schedule: ScheduleTime) -> Result<(), StorageError> {
        self.0.schedule = schedule;
        Ok(())
    }

    fn save_step(&mut self, _index: usize, steps: &StepList) -> Result<(), StorageError> {
        self.0.steps = *steps;
        Ok(())
    }
}

/// Three bytes per operation; `None` means "advance the clock".
fn decode(op: &[u8]) -> Option<AppCommand> {
    let arg = u16::from_le_bytes([op[1], op[2]]);
    Some(match op[0] % 10 {
        0 => AppCommand::StartProgram,
        1 => AppCommand::StopProgram,
        2 => AppCommand::ValveControl {
            valves: ValveMask::new(arg),
            duration_minutes: u16::from(op[1] % 8),
        },
        3 => AppCommand::PumpControl { on: op[1] & 1 == 1 },
        4 => AppCommand::SetSchedule { hour: op[1] % 26, minute: op[2] % 62 },
        5 => AppCommand::SetStep {
            index: usize::from(op[1] % 7),
            step: (op[2] & 1 == 1)
                .then(|| StepDefinition::new(ValveMask::new(arg), u16::from(op[2] % 5))),
        },
        6 => AppCommand::ReloadProgram,
        7 => AppCommand::GetStatus,
        _ => return None,
    })
}

fuzz_target!(|data: &[u8]| {
    let gateway = Gateway { valves: ValveMask::CLOSED, pump: false };
    let mut app = AppService::new(SystemConfig::default(), gateway, default_program());
    let mut store = MemProgram(default_program());
    let mut sink = NullSink;
    let mut minute_of_day: u32 = 19 * 60 + 58;

    for op in data.chunks_exact(3) {
        match decode(op) {
            Some(cmd) => {
                app.handle_command(cmd, &mut store, &mut sink);
            }
            None => {
                minute_of_day = (minute_of_day + 1 + u32::from(op[1] % 3)) % (24 * 60);
                let now = WallTime::new((minute_of_day / 60) as u8, (minute_of_day % 60) as u8);
                app.tick(now, &mut sink);
            }
        }

        let sched = app.scheduler();
        if sched.is_running() {
            assert!(sched.gateway().pump, "run in progress with pump off");
        }
        if sched.state() == StateId::AwaitingPump {
            assert!(sched.gateway().valves.is_closed(), "valves open before pump is primed");
        }
        if sched.state() == StateId::Idle {
            assert!(sched.active_step().is_none());
            assert_eq!(sched.minutes_remaining(), 0);
        }
    }
});
